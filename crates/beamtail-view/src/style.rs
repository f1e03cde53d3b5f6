//! Label prefix rendering

/// SGR foreground colors used for labels
const PALETTE: [u8; 12] = [31, 32, 33, 34, 35, 36, 91, 92, 93, 94, 95, 96];

const RESET: &str = "\x1b[0m";

/// How the `label + separator` prefix of each line is drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelStyle {
    /// Wrap labels in a color picked from the label text
    pub color: bool,
    /// Text between label and payload
    pub separator: String,
}

impl LabelStyle {
    pub fn new(color: bool, separator: impl Into<String>) -> Self {
        Self {
            color,
            separator: separator.into(),
        }
    }

    /// Uncolored prefix
    pub fn plain(separator: impl Into<String>) -> Self {
        Self::new(false, separator)
    }

    /// Prefix for a record of `label`
    pub fn prefix(&self, label: &str) -> String {
        if self.color {
            format!(
                "\x1b[{}m{}{}{}",
                label_color(label),
                label,
                RESET,
                self.separator
            )
        } else {
            format!("{}{}", label, self.separator)
        }
    }
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self::new(true, " | ")
    }
}

/// Same label, same color (FNV-1a over the label bytes)
fn label_color(label: &str) -> u8 {
    let hash = label
        .bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193));
    PALETTE[hash as usize % PALETTE.len()]
}
