// Weak rolling checksum (rsync style).
//
// Two 32-bit accumulators over a window of `n` bytes x_0..x_{n-1}:
//   a = sum(x_i)
//   b = sum of the running prefix sums of a = sum((n - i) * x_i)
// packed into one u64 as (a << 32) | b.  All arithmetic wraps mod 2^32.
//
// Sliding the window by one byte (x_0 leaves, x_n enters):
//   a' = a - x_0 + x_n
//   b' = sum_{i=1..n} (n - i + 1) * x_i
//      = (b - n * x_0) + a'
// which is what `update` computes in O(1).

/// Mask for the low (`b`) half of a packed checksum.
const LOW_MASK: u64 = 0xFFFF_FFFF;

/// Full checksum of `window`.
///
/// The window length is the block size of the session; callers pass exactly
/// `block_size` bytes.
#[inline]
pub fn checksum(window: &[u8]) -> u64 {
    let mut a: u32 = 0;
    let mut b: u32 = 0;
    for &x in window {
        a = a.wrapping_add(u32::from(x));
        b = b.wrapping_add(a);
    }
    combine(a, b)
}

/// Rolling update: the window of `window_len` bytes that produced `old`
/// lost `outgoing` at the front and gained `incoming` at the back.
#[inline(always)]
pub fn update(old: u64, outgoing: u8, incoming: u8, window_len: usize) -> u64 {
    let (a, b) = split(old);
    let out = u32::from(outgoing);
    let a = a.wrapping_sub(out).wrapping_add(u32::from(incoming));
    let b = b
        .wrapping_sub((window_len as u32).wrapping_mul(out))
        .wrapping_add(a);
    combine(a, b)
}

/// Pack the two accumulators, `a` in the high half.
#[inline(always)]
pub fn combine(a: u32, b: u32) -> u64 {
    (u64::from(a) << 32) | u64::from(b)
}

/// Unpack a checksum into `(a, b)`.
#[inline(always)]
pub fn split(cksum: u64) -> (u32, u32) {
    ((cksum >> 32) as u32, (cksum & LOW_MASK) as u32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
