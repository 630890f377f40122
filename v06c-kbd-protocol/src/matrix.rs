//! Matrix and modifier line model.
//!
//! Rows, modifiers and the indicator all live on the RP2040's single GPIO
//! bank, so one read of the input register yields a consistent sample and
//! there is never a half-updated state to deal with.

use bitflags::bitflags;

/// Number of row inputs.
pub const ROWS: usize = 8;

/// GPIO numbers on the bridge board.
pub mod pins {
    /// Rows occupy GPIO0..=7, row 0 on GPIO0.
    pub const ROW_LSB: u32 = 0;
    /// Columns occupy GPIO8..=15, column 0 on GPIO8.
    pub const COLUMN_LSB: u32 = 8;
    pub const ROW_MASK: u32 = 0xff << ROW_LSB;
    pub const COLUMN_MASK: u32 = 0xff << COLUMN_LSB;

    /// СС, УС and РУС/ЛАТ sit on three adjacent pins starting here.
    pub const LATCHED_LSB: u32 = 20;
    pub const SS: u32 = 20;
    pub const US: u32 = 21;
    pub const RUS_LAT: u32 = 22;
    pub const SBROS: u32 = 27;
    pub const VVOD: u32 = 28;
    pub const MODIFIER_MASK: u32 = (1 << SS) | (1 << US) | (1 << RUS_LAT) | (1 << SBROS) | (1 << VVOD);

    /// РУС indicator LED, active low.
    pub const INDICATOR: u32 = 26;
    pub const INDICATOR_MASK: u32 = 1 << INDICATOR;
}

bitflags! {
    /// Modifier byte as it goes out on the wire.
    ///
    /// The physical pin numbering is scattered (see [`pins`]); this is the
    /// order the host expects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// ВВОД, momentary.
        const VVOD = 1 << 0;
        /// СБРОС, momentary.
        const SBROS = 1 << 1;
        /// СС, latched.
        const SS = 1 << 5;
        /// УС, latched.
        const US = 1 << 6;
        /// РУС/ЛАТ, latched.
        const RUS_LAT = 1 << 7;
    }
}

/// Position of the latched group inside the modifier byte.
const LATCHED_SHIFT: u32 = 5;

#[cfg(feature = "defmt")]
impl defmt::Format for Modifiers {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Modifiers({=u8:#x})", self.bits())
    }
}

/// One snapshot of the row and modifier inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MatrixSample {
    /// Row levels, bit n = row n, 1 = active.
    pub rows: u8,
    pub modifiers: Modifiers,
}

impl MatrixSample {
    pub const fn new(rows: u8, modifiers: Modifiers) -> Self {
        Self { rows, modifiers }
    }

    /// Build a sample from one read of the GPIO input register.
    pub const fn from_levels(levels: u32) -> Self {
        let rows = ((levels & pins::ROW_MASK) >> pins::ROW_LSB) as u8;

        let latched = ((levels >> pins::LATCHED_LSB) & 0b111) << LATCHED_SHIFT;
        let vvod = (levels >> pins::VVOD) & 1;
        let sbros = ((levels >> pins::SBROS) & 1) << 1;

        Self {
            rows,
            modifiers: Modifiers::from_bits_truncate((latched | vvod | sbros) as u8),
        }
    }
}

/// Electrical column levels for a logical selection: a selected column is
/// pulled low, everything else idles high.
pub const fn column_levels(selected: u8) -> u8 {
    !selected
}

/// Inverse of [`column_levels`].
pub const fn selected_columns(levels: u8) -> u8 {
    !levels
}

/// Electrical level of the indicator pin; the LED lights when the pin is low.
pub const fn indicator_level(on: bool) -> bool {
    !on
}

/// Raw matrix access.
///
/// Implementations are plain register pokes with no acknowledgement and no
/// failure mode.
pub trait MatrixIo {
    /// Read rows and modifiers in a single access.
    fn sample(&mut self) -> MatrixSample;

    /// Drive the column lines. Bit n set selects column n (drives it low).
    /// Row inputs are not touched.
    fn drive_columns(&mut self, selected: u8);

    /// Switch the indicator; `true` lights it.
    fn drive_indicator(&mut self, on: bool);

    /// Columns currently selected, read back from the output latch.
    fn columns(&self) -> u8;

    /// Whether the indicator is currently lit.
    fn indicator(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_come_from_low_byte() {
        let sample = MatrixSample::from_levels(0xffff_ff0a & !pins::MODIFIER_MASK);
        assert_eq!(sample.rows, 0x0a);
        assert_eq!(sample.modifiers, Modifiers::empty());
    }

    #[test]
    fn modifiers_are_reordered_into_wire_layout() {
        let sample = MatrixSample::from_levels(1 << pins::VVOD);
        assert_eq!(sample.modifiers, Modifiers::VVOD);

        let sample = MatrixSample::from_levels(1 << pins::SBROS);
        assert_eq!(sample.modifiers, Modifiers::SBROS);

        let sample = MatrixSample::from_levels((1 << pins::SS) | (1 << pins::RUS_LAT));
        assert_eq!(sample.modifiers, Modifiers::SS | Modifiers::RUS_LAT);

        let sample = MatrixSample::from_levels(pins::MODIFIER_MASK);
        assert_eq!(sample.modifiers, Modifiers::all());
        assert_eq!(sample.rows, 0);
    }

    #[test]
    fn columns_and_indicator_are_active_low() {
        assert_eq!(column_levels(0b1100_0000), 0b0011_1111);
        assert_eq!(selected_columns(column_levels(0x5a)), 0x5a);
        assert!(!indicator_level(true));
        assert!(indicator_level(false));
    }

    #[test]
    fn outputs_do_not_overlap_inputs() {
        assert_eq!(pins::COLUMN_MASK & pins::ROW_MASK, 0);
        assert_eq!(pins::COLUMN_MASK & pins::MODIFIER_MASK, 0);
        assert_eq!(pins::INDICATOR_MASK & pins::MODIFIER_MASK, 0);
    }
}
