use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;


pub const SAT_PER_BTC: u64 = 100_000_000;


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("amount {0} BTC is not representable as whole satoshi")]
pub struct AmountError(pub Decimal);


/// Converts a node-reported BTC amount to whole satoshi.
///
/// The scaling is exact decimal arithmetic. Negative values and sub-satoshi
/// remainders are errors, never rounded away.
pub fn btc_to_sat(value: Decimal) -> Result<u64, AmountError> {
    let sat = value
        .checked_mul(Decimal::from(SAT_PER_BTC))
        .ok_or(AmountError(value))?;
    if !sat.is_integer() {
        return Err(AmountError(value))
    }
    sat.to_u64().ok_or(AmountError(value))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn btc(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn one_satoshi_converts_exactly() {
        assert_eq!(btc_to_sat(btc("0.00000001")).unwrap(), 1);
    }

    #[test]
    fn round_amounts() {
        assert_eq!(btc_to_sat(btc("0")).unwrap(), 0);
        assert_eq!(btc_to_sat(btc("1")).unwrap(), 100_000_000);
        assert_eq!(btc_to_sat(btc("50.0")).unwrap(), 5_000_000_000);
        assert_eq!(btc_to_sat(btc("0.1")).unwrap(), 10_000_000);
    }

    #[test]
    fn near_supply_cap_survives() {
        assert_eq!(
            btc_to_sat(btc("20999999.9769")).unwrap(),
            2_099_999_997_690_000
        );
    }

    #[test]
    fn sub_satoshi_precision_is_rejected() {
        assert!(btc_to_sat(btc("0.000000001")).is_err());
        assert!(btc_to_sat(btc("1.000000005")).is_err());
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(btc_to_sat(btc("-0.00000001")).is_err());
    }
}
