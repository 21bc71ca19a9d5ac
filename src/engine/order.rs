use crate::engine::{Candle, Position, Side};
use crate::errors::{Error, Result};

/// Decision returned by a [`Strategy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
    /// Go long `size` units; reverses an open short.
    Long(f64),
    /// Go short `size` units; reverses an open long.
    Short(f64),
    /// Close the open position.
    Close,
}

impl Order {
    /// Side the order opens, `Flat` for a close.
    pub fn side(&self) -> Side {
        match self {
            Self::Long(_) => Side::Long,
            Self::Short(_) => Side::Short,
            Self::Close => Side::Flat,
        }
    }

    /// Requested size, zero for a close.
    pub fn size(&self) -> f64 {
        match self {
            Self::Long(size) | Self::Short(size) => *size,
            Self::Close => 0.0,
        }
    }

    /// Rejects non-positive or non-finite sizes.
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Long(size) | Self::Short(size) if !size.is_finite() || *size <= 0.0 => {
                Err(Error::InvalidOrder(format!("size must be positive (got: {size})")))
            }
            _ => Ok(()),
        }
    }
}

/// Source of trading decisions.
///
/// `history` holds every candle consumed so far, the current one last.
pub trait Strategy {
    /// Returns the order to apply on `candle`, if any.
    fn decide(&mut self, candle: &Candle, position: &Position, history: &[Candle]) -> Option<Order>;
}

impl<F> Strategy for F
where
    F: FnMut(&Candle, &Position, &[Candle]) -> Option<Order>,
{
    fn decide(&mut self, candle: &Candle, position: &Position, history: &[Candle]) -> Option<Order> {
        self(candle, position, history)
    }
}

#[cfg(test)]
#[test]
fn order_side_and_size() {
    assert_eq!(Order::Long(2.0).side(), Side::Long);
    assert_eq!(Order::Short(1.5).size(), 1.5);
    assert_eq!(Order::Close.side(), Side::Flat);
    assert_eq!(Order::Close.size(), 0.0);
}

#[cfg(test)]
#[test]
fn invalid_sizes() {
    assert!(Order::Long(1.0).validate().is_ok());
    assert!(Order::Close.validate().is_ok());
    assert!(matches!(Order::Long(0.0).validate(), Err(Error::InvalidOrder(_))));
    assert!(matches!(Order::Short(f64::NAN).validate(), Err(Error::InvalidOrder(_))));
}

#[cfg(test)]
#[test]
fn closure_is_a_strategy() {
    use chrono::DateTime;

    let candle = crate::engine::CandleBuilder::builder()
        .open_time(DateTime::default())
        .open(1.0)
        .high(1.0)
        .low(1.0)
        .close(1.0)
        .build()
        .unwrap();

    let mut strategy = |_: &Candle, _: &Position, history: &[Candle]| (history.len() > 1).then_some(Order::Close);
    assert_eq!(strategy.decide(&candle, &Position::flat(), &[candle]), None);
    assert_eq!(strategy.decide(&candle, &Position::flat(), &[candle, candle]), Some(Order::Close));
}
