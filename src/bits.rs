//! Bit-field helpers for 16-bit instruction words.

/// Treats the low `bit_count` bits of `value` as a two's-complement number and
/// widens it to 16 bits. Bits above the field are ignored.
#[inline]
pub fn sign_extend(value: u16, bit_count: u32) -> u16 {
    debug_assert!((1..=16).contains(&bit_count));
    let shift = 16 - bit_count;
    (((value << shift) as i16) >> shift) as u16
}

/// Extracts `width` bits of `word` starting at bit `shift`.
#[inline]
pub fn field(word: u16, shift: u32, width: u32) -> u16 {
    ((u32::from(word) >> shift) & ((1u32 << width) - 1)) as u16
}

/// Sign-extended offset held in the low `bit_count` bits (imm5, offset6, PCoffset9, PCoffset11).
#[inline]
pub fn offset(word: u16, bit_count: u32) -> u16 {
    sign_extend(field(word, 0, bit_count), bit_count)
}

/// Whether bit `n` of `word` is set.
#[inline]
pub fn bit(word: u16, n: u32) -> bool {
    field(word, n, 1) == 1
}
