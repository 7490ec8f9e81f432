use crate::types::EnumType;

///
/// DefinedValues
///
/// Precomputed validity data for one enum type.
///
/// Non-flags enums keep sorted, merged `[start, end]` ranges; values whose
/// gap is at most one share a range. Flags enums keep the OR of all members,
/// combined in the signed or unsigned 64-bit domain of the underlying type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DefinedValues {
    Ranges(Vec<(i128, i128)>),
    Flags { mask: i128, signed: bool },
}

impl DefinedValues {
    #[must_use]
    pub fn analyze(enum_type: &EnumType) -> Self {
        let values = enum_type.members.iter().map(|(_, value)| *value);

        if enum_type.flags {
            let signed = !enum_type
                .underlying
                .numeric()
                .is_some_and(|facts| facts.is_unsigned());

            Self::Flags {
                mask: combine_flags(values, signed),
                signed,
            }
        } else {
            Self::Ranges(merge_ranges(values))
        }
    }

    #[must_use]
    pub fn contains(&self, raw: i128) -> bool {
        match self {
            Self::Ranges(ranges) => ranges
                .binary_search_by(|(start, end)| {
                    if *end < raw {
                        std::cmp::Ordering::Less
                    } else if *start > raw {
                        std::cmp::Ordering::Greater
                    } else {
                        std::cmp::Ordering::Equal
                    }
                })
                .is_ok(),
            Self::Flags { mask, signed } => {
                let (bits, mask) = if *signed {
                    (to_bits_signed(raw), to_bits_signed(*mask))
                } else {
                    (to_bits_unsigned(raw), to_bits_unsigned(*mask))
                };

                bits & !mask == 0
            }
        }
    }
}

fn merge_ranges(values: impl Iterator<Item = i128>) -> Vec<(i128, i128)> {
    let mut sorted = values.collect::<Vec<_>>();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<(i128, i128)> = Vec::new();
    for value in sorted {
        match ranges.last_mut() {
            Some((_, end)) if value - *end <= 1 => *end = value,
            _ => ranges.push((value, value)),
        }
    }

    ranges
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn combine_flags(values: impl Iterator<Item = i128>, signed: bool) -> i128 {
    if signed {
        i128::from(values.fold(0i64, |acc, value| acc | value as i64))
    } else {
        i128::from(values.fold(0u64, |acc, value| acc | value as u64))
    }
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn to_bits_signed(value: i128) -> u64 {
    value as i64 as u64
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn to_bits_unsigned(value: i128) -> u64 {
    value as u64
}
