//! Element catalog and bond recipes.

use ratatui::style::Color;

/// Number of element kinds in the catalog.
pub const ELEMENT_COUNT: usize = 6;

/// Element kinds a piece can carry (H, O, Na, Cl, N, C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Hydrogen,
    Oxygen,
    Sodium,
    Chlorine,
    Nitrogen,
    Carbon,
}

/// Display metadata for one element kind. Descriptive only, no behaviour.
#[derive(Debug, Clone, Copy)]
pub struct ElementInfo {
    pub atomic_number: u8,
    pub symbol: &'static str,
    pub name: &'static str,
    pub color: Color,
}

impl ElementKind {
    pub const ALL: [Self; ELEMENT_COUNT] = [
        Self::Hydrogen,
        Self::Oxygen,
        Self::Sodium,
        Self::Chlorine,
        Self::Nitrogen,
        Self::Carbon,
    ];

    /// Catalog index 0..ELEMENT_COUNT; used to key per-type count arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Hydrogen => 0,
            Self::Oxygen => 1,
            Self::Sodium => 2,
            Self::Chlorine => 3,
            Self::Nitrogen => 4,
            Self::Carbon => 5,
        }
    }

    pub fn info(self) -> &'static ElementInfo {
        &ELEMENTS[self.index()]
    }

    #[inline]
    pub fn symbol(self) -> &'static str {
        self.info().symbol
    }
}

/// Static element table, indexed by `ElementKind::index`.
pub static ELEMENTS: [ElementInfo; ELEMENT_COUNT] = [
    ElementInfo {
        atomic_number: 1,
        symbol: "H",
        name: "Hydrogen",
        color: Color::Rgb(0xEC, 0xEF, 0xF4),
    },
    ElementInfo {
        atomic_number: 8,
        symbol: "O",
        name: "Oxygen",
        color: Color::Rgb(0xE0, 0x6C, 0x75),
    },
    ElementInfo {
        atomic_number: 11,
        symbol: "Na",
        name: "Sodium",
        color: Color::Rgb(0xAB, 0xB2, 0xBF),
    },
    ElementInfo {
        atomic_number: 17,
        symbol: "Cl",
        name: "Chlorine",
        color: Color::Rgb(0x98, 0xC3, 0x79),
    },
    ElementInfo {
        atomic_number: 7,
        symbol: "N",
        name: "Nitrogen",
        color: Color::Rgb(0x61, 0xAF, 0xEF),
    },
    ElementInfo {
        atomic_number: 6,
        symbol: "C",
        name: "Carbon",
        color: Color::Rgb(0x5C, 0x63, 0x70),
    },
];

/// An exact multiset of element counts that removes as one bond.
///
/// `required[k]` is how many pieces of element index `k` the bond needs.
/// `total_pieces` is precomputed at construction and never recomputed.
#[derive(Debug, Clone)]
pub struct BondRecipe {
    pub name: &'static str,
    pub required: [u8; ELEMENT_COUNT],
    pub score: u32,
    pub total_pieces: u8,
}

impl BondRecipe {
    pub fn new(name: &'static str, required: [u8; ELEMENT_COUNT], score: u32) -> Self {
        let total_pieces = required.iter().sum();
        Self {
            name,
            required,
            score,
            total_pieces,
        }
    }

    /// How many pieces of `kind` this recipe needs (0 = not part of the bond).
    #[inline]
    pub fn requires(&self, kind: ElementKind) -> u8 {
        self.required[kind.index()]
    }
}

/// Default recipe catalog, in match-priority order.
pub fn default_recipes() -> Vec<BondRecipe> {
    use ElementKind::{Carbon, Chlorine, Hydrogen, Nitrogen, Oxygen, Sodium};
    let counts = |pairs: &[(ElementKind, u8)]| {
        let mut req = [0u8; ELEMENT_COUNT];
        for &(kind, n) in pairs {
            req[kind.index()] = n;
        }
        req
    };
    vec![
        BondRecipe::new("H2O", counts(&[(Hydrogen, 2), (Oxygen, 1)]), 100),
        BondRecipe::new("NaCl", counts(&[(Sodium, 1), (Chlorine, 1)]), 150),
        BondRecipe::new("CO2", counts(&[(Carbon, 1), (Oxygen, 2)]), 200),
        BondRecipe::new("NH3", counts(&[(Nitrogen, 1), (Hydrogen, 3)]), 175),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_metadata() {
        assert_eq!(ElementKind::Hydrogen.symbol(), "H");
        assert_eq!(ElementKind::Sodium.info().atomic_number, 11);
        assert_eq!(ElementKind::Carbon.info().name, "Carbon");
        for (i, kind) in ElementKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_recipe_totals_precomputed() {
        let recipes = default_recipes();
        let totals: Vec<u8> = recipes.iter().map(|r| r.total_pieces).collect();
        assert_eq!(totals, vec![3, 2, 3, 4]);
    }

    #[test]
    fn test_default_catalog_order_and_scores() {
        let recipes = default_recipes();
        let names: Vec<&str> = recipes.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["H2O", "NaCl", "CO2", "NH3"]);
        assert_eq!(recipes[0].requires(ElementKind::Hydrogen), 2);
        assert_eq!(recipes[0].requires(ElementKind::Oxygen), 1);
        assert_eq!(recipes[2].score, 200);
        assert_eq!(recipes[3].requires(ElementKind::Chlorine), 0);
    }
}
