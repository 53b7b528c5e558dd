/// Coarse delivery region derived from a destination address. Orders are
/// only mixed on a vehicle within one region, so the label alphabet, the
/// match priority and the fall-through are part of the external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Tokyo23Wards,
    TokyoWest,
    Kanagawa,
    Saitama,
    Chiba,
    Other,
}

impl Region {
    /// Priority-ordered substring match; total over every address.
    pub fn classify(address: &str) -> Region {
        if address.contains("東京都") {
            if address.contains("区") {
                Region::Tokyo23Wards
            } else {
                Region::TokyoWest
            }
        } else if address.contains("神奈川県") {
            Region::Kanagawa
        } else if address.contains("埼玉県") {
            Region::Saitama
        } else if address.contains("千葉県") {
            Region::Chiba
        } else {
            Region::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::Tokyo23Wards => "tokyo_23_wards",
            Region::TokyoWest => "tokyo_west",
            Region::Kanagawa => "kanagawa",
            Region::Saitama => "saitama",
            Region::Chiba => "chiba",
            Region::Other => "other",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
