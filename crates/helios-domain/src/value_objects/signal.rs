/// Desired position direction for one bar: short, flat or long. A target state,
/// not an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    Short,
    #[default]
    Flat,
    Long,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }

    pub fn is_flat(self) -> bool {
        matches!(self, Signal::Flat)
    }
}
