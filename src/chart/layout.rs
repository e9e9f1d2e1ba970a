use serde::Serialize;

const MIN_RIGHT_MARGIN: u32 = 64;
const CHIP_PAD_X: u32 = 8;
const CHIP_GAP: u32 = 8;

/// Sizes for the logo + value chip drawn at the end of each series,
/// derived from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelLayout {
    pub logo_base: u32,
    pub logo_size: u32,
    pub margin_factor: f64,
    pub font_size: u32,
    pub halo_radius: u32,
}

impl LabelLayout {
    pub fn for_viewport(vw: u32) -> Self {
        let (logo_base, margin_factor, font_size) = match vw {
            0..=379 => (21, 1.2, 11),
            380..=639 => (27, 1.35, 12),
            640..=1023 => (42, 1.6, 13),
            _ => (44, 1.7, 13),
        };
        // rendered logo is two thirds of the logical size
        let logo_size = round(logo_base as f64 * 2.0 / 3.0);
        let halo_radius = round(logo_base as f64 / 3.0 * (2.0 / 3.0));
        Self { logo_base, logo_size, margin_factor, font_size, halo_radius }
    }

    /// Right margin needed for the logo alone.
    pub fn min_right_margin(&self) -> u32 {
        MIN_RIGHT_MARGIN.max(round(self.logo_size as f64 * self.margin_factor))
    }

    fn char_width(&self) -> u32 {
        round(self.font_size as f64 * 0.62)
    }

    pub fn chip_width(&self, label: &str) -> u32 {
        label.chars().count() as u32 * self.char_width() + CHIP_PAD_X * 2
    }

    pub fn chip_height(&self) -> u32 {
        self.font_size + 8
    }

    /// Chip offset relative to the series end point.
    pub fn chip_offset(&self) -> (i32, i32) {
        let x = round(self.logo_size as f64 * 0.7) + CHIP_GAP;
        let y = -(round(self.chip_height() as f64 / 2.0) as i32);
        (x as i32, y)
    }

    /// Horizontal space a value label occupies past the end point.
    pub fn label_extent(&self, label: &str) -> u32 {
        self.chip_width(label) + round(self.logo_size as f64 * 0.7) + 10
    }

    /// Chart right margin wide enough for the widest visible label.
    pub fn right_margin<'a, I>(&self, labels: I) -> u32
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels
            .into_iter()
            .map(|l| self.label_extent(l))
            .fold(self.min_right_margin(), u32::max)
    }
}

fn round(v: f64) -> u32 {
    v.round().max(0.0) as u32
}
