use crate::traits::BondLike;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Quadruple,
    /// No order recorded, e.g. a query bond or an aromatic bond that was
    /// never kekulized.
    Unset,
}

impl BondOrder {
    /// Contribution to an atom's valence. `Unset` contributes nothing.
    pub fn numeric(self) -> u8 {
        match self {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
            BondOrder::Unset => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bond {
    pub order: BondOrder,
    pub is_aromatic: bool,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self {
            order,
            is_aromatic: false,
        }
    }

    pub fn single() -> Self {
        Self::new(BondOrder::Single)
    }

    pub fn double() -> Self {
        Self::new(BondOrder::Double)
    }

    pub fn triple() -> Self {
        Self::new(BondOrder::Triple)
    }

    pub fn aromatic(order: BondOrder) -> Self {
        Self {
            order,
            is_aromatic: true,
        }
    }
}

impl crate::traits::HasBondOrder for Bond {
    fn bond_order(&self) -> BondOrder {
        self.order
    }
}

impl crate::traits::HasAromaticity for Bond {
    fn is_aromatic(&self) -> bool {
        self.is_aromatic
    }
}

impl BondLike for Bond {}
