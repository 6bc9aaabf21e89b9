//! Barcode scan results

use std::fmt;

use chrono::{DateTime, Utc};

/// A decoded barcode delivered by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeScan {
    /// AIM symbology identifier character
    pub aim_id: char,
    
    /// AIM modifier character
    pub aim_modifier: char,
    
    /// Barcode text
    pub data: String,
    
    /// Time the frame was parsed
    pub received_at: DateTime<Utc>,
}

impl BarcodeScan {
    pub fn new(aim_id: char, aim_modifier: char, data: impl Into<String>) -> Self {
        Self {
            aim_id,
            aim_modifier,
            data: data.into(),
            received_at: Utc::now(),
        }
    }
    
    /// Full AIM symbology identifier in its `]cm` form
    pub fn aim_identifier(&self) -> String {
        format!("]{}{}", self.aim_id, self.aim_modifier)
    }
}

impl fmt::Display for BarcodeScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Barcode[{}]: {}", self.aim_identifier(), self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_aim_identifier() {
        let scan = BarcodeScan::new('E', '0', "5012345678900");
        assert_eq!(scan.aim_identifier(), "]E0");
        assert_eq!(scan.to_string(), "Barcode[]E0]: 5012345678900");
    }
}
