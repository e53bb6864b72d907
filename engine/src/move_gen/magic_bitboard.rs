use std::fmt;

use strum::IntoEnumIterator;

use crate::bitboard::{BitBoard, Square};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MagicTableError {
    #[error(
        "{slider} magic for {square} maps blockers {first:#x} and {second:#x} to index {index} \
         with different attacks"
    )]
    Collision {
        slider: Slider,
        square: Square,
        index: usize,
        first: u64,
        second: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slider {
    Rook,
    Bishop,
}

impl Slider {
    const fn directions(self) -> [(i8, i8); 4] {
        match self {
            Slider::Rook => [(1, 0), (-1, 0), (0, 1), (0, -1)],
            Slider::Bishop => [(1, 1), (1, -1), (-1, 1), (-1, -1)],
        }
    }
}

impl fmt::Display for Slider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slider::Rook => write!(f, "rook"),
            Slider::Bishop => write!(f, "bishop"),
        }
    }
}

/// Squares whose occupancy can change `slider`'s attacks from `square`. The
/// last square of each ray is left out since nothing lies beyond it.
pub(crate) fn relevance_mask(slider: Slider, square: Square) -> BitBoard {
    let mut mask = BitBoard::empty();
    for (rank_delta, file_delta) in slider.directions() {
        let mut curr = square;
        while let Some(next) = curr.offset(rank_delta, file_delta) {
            if next.offset(rank_delta, file_delta).is_none() {
                break;
            }
            mask.set_square(next);
            curr = next;
        }
    }
    mask
}

/// Walks each ray until the board edge or the first blocker, including the
/// blocker's square.
pub(crate) fn ray_cast_attacks(slider: Slider, square: Square, blockers: BitBoard) -> BitBoard {
    let mut attacks = BitBoard::empty();
    for (rank_delta, file_delta) in slider.directions() {
        let mut curr = square;
        while let Some(next) = curr.offset(rank_delta, file_delta) {
            attacks.set_square(next);
            if blockers.is_square_set(next) {
                break;
            }
            curr = next;
        }
    }
    attacks
}

#[derive(Debug, Clone, Copy, Default)]
struct MagicEntry {
    mask: u64,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl MagicEntry {
    fn index(&self, occupancy: BitBoard) -> usize {
        let blockers = occupancy.to_val() & self.mask;
        self.offset + (blockers.wrapping_mul(self.magic) >> self.shift) as usize
    }
}

/// Perfect hash from (square, relevant blockers) to an attack set. Every
/// square's slots live in one shared `Vec`, starting at that square's offset.
pub struct MagicTable {
    slider: Slider,
    entries: [MagicEntry; 64],
    attacks: Vec<BitBoard>,
}

impl MagicTable {
    pub fn generate(slider: Slider, magics: &[u64; 64]) -> Result<Self, MagicTableError> {
        let mut entries = [MagicEntry::default(); 64];
        let mut attacks = Vec::new();

        for square in Square::iter() {
            let mask = relevance_mask(slider, square);
            let bits = mask.num_squares_set();
            let entry = MagicEntry {
                mask: mask.to_val(),
                magic: magics[square.index()],
                shift: 64 - bits,
                offset: attacks.len(),
            };

            // (blockers, attacks) per slot, for reporting collisions.
            let mut slots: Vec<Option<(u64, BitBoard)>> = vec![None; 1 << bits];

            // Carry-rippler walk over every subset of the mask, starting and
            // ending at the empty set.
            let mut subset = 0u64;
            loop {
                let blockers = BitBoard::from_val(subset);
                let attack = ray_cast_attacks(slider, square, blockers);
                let index = entry.index(blockers) - entry.offset;

                match slots[index] {
                    None => slots[index] = Some((subset, attack)),
                    Some((_, existing)) if existing == attack => {}
                    Some((first, _)) => {
                        return Err(MagicTableError::Collision {
                            slider,
                            square,
                            index,
                            first,
                            second: subset,
                        })
                    }
                }

                subset = subset.wrapping_sub(entry.mask) & entry.mask;
                if subset == 0 {
                    break;
                }
            }

            attacks.extend(
                slots
                    .into_iter()
                    .map(|slot| slot.map_or(BitBoard::empty(), |(_, attack)| attack)),
            );
            entries[square.index()] = entry;
        }

        tracing::debug!(
            slider = %slider,
            slots = attacks.len(),
            "generated magic attack table"
        );

        Ok(Self {
            slider,
            entries,
            attacks,
        })
    }

    pub fn slider(&self) -> Slider {
        self.slider
    }

    pub fn attacks(&self, square: Square, occupancy: BitBoard) -> BitBoard {
        self.attacks[self.entries[square.index()].index(occupancy)]
    }
}

#[rustfmt::skip]
pub const ROOK_MAGICS: [u64; 64] = [
    0x0480084000812010, 0x0040001000c12000, 0x0200104a00824020, 0x8880100028002580,
    0x2080140008000280, 0x0100010006080400, 0x01004a0000810004, 0x008002a841000080,
    0x0021800140002081, 0x000c401001402000, 0x0852004020108200, 0x00560020400a0011,
    0x8008800401800802, 0x1209000a04010028, 0x2043001600090004, 0x0404800080104900,
    0x1080004002a00040, 0x0050004000482000, 0x000088802000d000, 0x0101808010000806,
    0x08a2020020440890, 0x0001010002040008, 0x1500840002080190, 0x0010020004008041,
    0x008004414000e000, 0x0020200080804000, 0x0020200080801000, 0x0208080080100080,
    0x8040440080800800, 0x00280400801a0080, 0x0010051400481026, 0x1580800c80024500,
    0x008000400ac02001, 0x0001008202004264, 0x090011c305002000, 0x0000880084801000,
    0x0200040080804800, 0x0002001102000c08, 0x0c0910480c000201, 0x0000800840800300,
    0x0080248840088000, 0x2018200050084000, 0x2800408200120020, 0x400010c20022000a,
    0x0a51010408010010, 0x0402001008c20044, 0x0801040200010100, 0x0400018244120001,
    0x8195018000402900, 0x2840804001002100, 0x0000801000200080, 0x1001300108008080,
    0x8025240080080080, 0x0209000208440100, 0x0021002482000100, 0x01a10000c601a100,
    0x0000508001a0c101, 0x4022542081004005, 0x02042042000a8052, 0x4000a06900045001,
    0x010200100c200802, 0x0003000802240005, 0x0080021008008104, 0x00028a4110840062,
];

#[rustfmt::skip]
pub const BISHOP_MAGICS: [u64; 64] = [
    0x0002101001004084, 0x0053b801c1020382, 0x0488109902080808, 0x01140416800004c0,
    0x000404a012000180, 0x4001046004000401, 0x000404040c040010, 0x2021450198200200,
    0x800220a00400c080, 0x0040100102408200, 0x0800080821022010, 0x0000040c28800002,
    0x20001404a0200200, 0x0304cc2404406212, 0x3825020202024002, 0x4160420220922810,
    0x0609011020180080, 0x0020020838808080, 0x0610000214001020, 0x0182000402120124,
    0x06160284010c0422, 0x0000200200842009, 0x0902000401010800, 0x0801601504110c08,
    0x00600c520a100440, 0x12501081042c1091, 0x1008020001040500, 0x8810040020440008,
    0x1002040082008605, 0x008041800100a001, 0x8020810101981802, 0x2401104101040890,
    0x0004044041a0a208, 0x08008c3021200a80, 0x2404020880a10400, 0x0404028180080200,
    0x10050104000e0120, 0x0210021021121001, 0x0406240100004844, 0x00c10504a2210400,
    0x0200843008104110, 0x2000b41008040200, 0x0000202130080800, 0x52502e2018002100,
    0x0107084208200400, 0x0020200141c0a081, 0x6060010200900200, 0x8801040109c20a02,
    0x802c1403880a0000, 0x0c80209828284000, 0x200002004a088209, 0x0808880221882010,
    0x2104801006020001, 0x080020201218808a, 0x28c942080a040880, 0x1020040082084044,
    0x004102480c041234, 0x00410f08c8040500, 0xa001000046180402, 0x4000041a08841c00,
    0x1040006044050400, 0x0000080461440102, 0x6250a02004408192, 0x014c0802c4008201,
];
