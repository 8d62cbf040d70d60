use alloy::primitives::{Address, U256};
use std::str::FromStr;
use crate::dexes::DexError;

const BPS_DENOMINATOR: u64 = 10_000;
const PRICE_SIGNIFICANT_DIGITS: usize = 6;
const MAX_PRICE_FRACTION_DIGITS: usize = 96;

/// Amount parsing/formatting, address checks and slippage math shared by quoting and execution
pub struct DexUtils;

impl DexUtils {
    /// Parse amount string to U256 with proper decimal handling - NO FLOATING POINT
    pub fn parse_amount_safe(amount: &str, decimals: u8) -> Result<U256, DexError> {
        let amount = amount.trim();
        if amount.is_empty() {
            return Err(DexError::InvalidAmount("Empty amount".into()));
        }

        // Split on decimal point
        let parts: Vec<&str> = amount.split('.').collect();
        if parts.len() > 2 {
            return Err(DexError::InvalidAmount("Multiple decimal points".into()));
        }

        let whole_str = if parts[0].is_empty() { "0" } else { parts[0] };
        if !whole_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DexError::InvalidAmount(format!("Invalid whole number: {}", whole_str)));
        }
        let whole_part = U256::from_str_radix(whole_str, 10)
            .map_err(|e| DexError::InvalidAmount(format!("Invalid whole number: {}", e)))?;

        // Parse decimal part
        let decimal_part = if parts.len() > 1 {
            let decimal_str = parts[1];
            if decimal_str.len() > decimals as usize {
                return Err(DexError::InvalidAmount("Too many decimal places".into()));
            }
            if !decimal_str.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DexError::InvalidAmount(format!("Invalid decimal part: {}", decimal_str)));
            }
            // Pad with zeros to match decimals
            let padded = format!("{:0<width$}", decimal_str, width = decimals as usize);
            if padded.is_empty() {
                U256::ZERO
            } else {
                U256::from_str_radix(&padded, 10)
                    .map_err(|e| DexError::InvalidAmount(format!("Invalid decimal part: {}", e)))?
            }
        } else {
            U256::ZERO
        };

        // whole * 10^decimals + decimal_part
        let multiplier = U256::from(10).pow(U256::from(decimals));
        whole_part
            .checked_mul(multiplier)
            .and_then(|whole_wei| whole_wei.checked_add(decimal_part))
            .ok_or_else(|| DexError::InvalidAmount(format!("Amount {} overflows uint256", amount)))
    }

    /// Format U256 amount to human-readable string with proper decimal handling
    pub fn format_amount_safe(amount: U256, decimals: u8) -> String {
        let decimals = decimals as usize;
        if decimals == 0 {
            return amount.to_string();
        }

        // left-pad so there is always at least one whole digit
        let digits = format!("{:0>width$}", amount.to_string(), width = decimals + 1);
        let (whole, fraction) = digits.split_at(digits.len() - decimals);
        let fraction = fraction.trim_end_matches('0');

        if fraction.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, fraction)
        }
    }

    /// `amount_out / amount_in` in human units, rounded half-up to six significant digits
    pub fn format_price(amount_out: U256, decimals_out: u8, amount_in: U256, decimals_in: u8) -> Result<String, DexError> {
        if amount_in.is_zero() {
            return Err(DexError::InvalidAmount("Cannot price a zero input".into()));
        }
        let overflow = || DexError::InvalidAmount("Price overflows uint256".into());
        let numerator = amount_out
            .checked_mul(Self::pow10(decimals_in)?)
            .ok_or_else(overflow)?;
        let denominator = amount_in
            .checked_mul(Self::pow10(decimals_out)?)
            .ok_or_else(overflow)?;

        let whole = numerator / denominator;
        let mut remainder = numerator % denominator;
        let mut digits: Vec<u8> = if whole.is_zero() {
            Vec::new()
        } else {
            whole.to_string().bytes().map(|b| b - b'0').collect()
        };
        let mut whole_len = digits.len();

        // long division until one digit past the significant ones is known
        let ten = U256::from(10);
        let mut fraction_len = 0;
        loop {
            let significant = digits.iter().position(|d| *d != 0).map(|first| digits.len() - first);
            if significant.is_some_and(|count| count > PRICE_SIGNIFICANT_DIGITS)
                || remainder.is_zero()
                || fraction_len >= MAX_PRICE_FRACTION_DIGITS
            {
                break;
            }
            remainder = remainder.checked_mul(ten).ok_or_else(overflow)?;
            digits.push((remainder / denominator).to::<u8>());
            remainder %= denominator;
            fraction_len += 1;
        }

        let Some(first) = digits.iter().position(|d| *d != 0) else {
            return Ok("0".to_string());
        };

        let cut = first + PRICE_SIGNIFICANT_DIGITS;
        if cut < digits.len() {
            let round_up = digits[cut] >= 5;
            digits.truncate(cut);
            if round_up {
                let mut index = cut;
                loop {
                    if index == 0 {
                        digits.insert(0, 1);
                        whole_len += 1;
                        break;
                    }
                    index -= 1;
                    if digits[index] == 9 {
                        digits[index] = 0;
                    } else {
                        digits[index] += 1;
                        break;
                    }
                }
            }
            if digits.len() < whole_len {
                digits.resize(whole_len, 0);
            }
        }

        let render = |part: &[u8]| part.iter().map(|d| char::from(b'0' + d)).collect::<String>();
        let whole = if whole_len == 0 { "0".to_string() } else { render(&digits[..whole_len]) };
        let fraction = render(&digits[whole_len..]);
        let fraction = fraction.trim_end_matches('0');

        Ok(if fraction.is_empty() { whole } else { format!("{}.{}", whole, fraction) })
    }

    fn pow10(exponent: u8) -> Result<U256, DexError> {
        U256::from(10)
            .checked_pow(U256::from(exponent))
            .ok_or_else(|| DexError::InvalidAmount(format!("10^{} overflows uint256", exponent)))
    }

    /// Checked address parse; `None` for anything that is not a 20-byte hex address.
    /// All-lowercase input is taken as is, anything with capitals must carry a valid EIP-55 checksum.
    pub fn parse_address(address: &str) -> Option<Address> {
        let trimmed = address.trim();
        let hex = trimmed.strip_prefix("0x")?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        if hex.bytes().any(|b| b.is_ascii_uppercase()) {
            Address::parse_checksummed(trimmed, None).ok()
        } else {
            Address::from_str(trimmed).ok()
        }
    }

    /// Same as [`DexUtils::parse_address`] but as a typed error for request validation
    pub fn require_address(address: &str, field: &str) -> Result<Address, DexError> {
        Self::parse_address(address)
            .ok_or_else(|| DexError::InvalidAddress(format!("{}: {}", field, address)))
    }

    /// Validate token pair for basic sanity checks
    pub fn validate_token_pair_addresses(token_a: &Address, token_b: &Address) -> Result<(), DexError> {
        if token_a == token_b {
            return Err(DexError::InvalidToken("Identical tokens".into()));
        }

        if token_a.is_zero() || token_b.is_zero() {
            return Err(DexError::InvalidToken("Zero address not allowed".into()));
        }

        Ok(())
    }

    /// Slippage percent string ("0.5" = 0.5%) to basis points
    pub fn parse_slippage_bps(slippage_percent: &str) -> Result<u16, DexError> {
        let bps = Self::parse_amount_safe(slippage_percent, 2)
            .map_err(|e| DexError::InvalidAmount(format!("Invalid slippage: {}", e)))?;
        if bps > U256::from(BPS_DENOMINATOR) {
            return Err(DexError::InvalidAmount(format!("Slippage {}% above 100%", slippage_percent)));
        }
        Ok(bps.to::<u16>())
    }

    /// Calculate minimum amount out with slippage protection
    pub fn calculate_min_amount_out(amount_out: U256, slippage_bps: u16) -> U256 {
        if u64::from(slippage_bps) >= BPS_DENOMINATOR {
            return U256::ZERO; // 100%+ slippage = no minimum
        }

        let slippage_factor = U256::from(BPS_DENOMINATOR - u64::from(slippage_bps));
        (amount_out * slippage_factor) / U256::from(BPS_DENOMINATOR)
    }

    /// Maximum amount in with slippage premium, rounded up so the limit never undershoots
    pub fn calculate_max_amount_in(amount_in: U256, slippage_bps: u16) -> U256 {
        let numerator = amount_in.saturating_mul(U256::from(BPS_DENOMINATOR + u64::from(slippage_bps)));
        let denominator = U256::from(BPS_DENOMINATOR);
        let quotient = numerator / denominator;
        if (numerator % denominator).is_zero() {
            quotient
        } else {
            quotient + U256::from(1)
        }
    }

    /// Validate amount is not zero
    pub fn validate_amount(amount: U256) -> Result<(), DexError> {
        if amount.is_zero() {
            return Err(DexError::InvalidAmount("Amount cannot be zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_safe() {
        // Test whole numbers
        assert_eq!(DexUtils::parse_amount_safe("100", 18).unwrap(), U256::from(100) * U256::from(10).pow(U256::from(18)));

        // Test decimals
        assert_eq!(DexUtils::parse_amount_safe("1.5", 18).unwrap(), U256::from(15) * U256::from(10).pow(U256::from(17)));

        // Test USDC (6 decimals)
        assert_eq!(DexUtils::parse_amount_safe("1000.123456", 6).unwrap(), U256::from(1000123456));

        // Test precision
        assert_eq!(DexUtils::parse_amount_safe("0.000001", 6).unwrap(), U256::from(1));
        assert_eq!(DexUtils::parse_amount_safe(".5", 6).unwrap(), U256::from(500_000));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(DexUtils::parse_amount_safe("", 18).is_err());
        assert!(DexUtils::parse_amount_safe("1.2.3", 18).is_err());
        assert!(DexUtils::parse_amount_safe("0.0000001", 6).is_err());
        assert!(DexUtils::parse_amount_safe("-1", 6).is_err());
        assert!(DexUtils::parse_amount_safe("1e6", 6).is_err());
    }

    #[test]
    fn test_format_amount_safe() {
        // Test whole numbers
        let amount = U256::from(100) * U256::from(10).pow(U256::from(18));
        assert_eq!(DexUtils::format_amount_safe(amount, 18), "100");

        // Test decimals
        let amount = U256::from(15) * U256::from(10).pow(U256::from(17));
        assert_eq!(DexUtils::format_amount_safe(amount, 18), "1.5");

        // Test USDC
        assert_eq!(DexUtils::format_amount_safe(U256::from(1000123456), 6), "1000.123456");
        assert_eq!(DexUtils::format_amount_safe(U256::from(25_100_000), 6), "25.1");
        assert_eq!(DexUtils::format_amount_safe(U256::from(5), 6), "0.000005");
        assert_eq!(DexUtils::format_amount_safe(U256::from(7), 0), "7");
        assert_eq!(DexUtils::format_amount_safe(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_format_amount_beyond_uint256_precision() {
        // 10^80 does not fit a U256 divisor; padding still places the point
        let expected = format!("0.{}15", "0".repeat(78));
        assert_eq!(DexUtils::format_amount_safe(U256::from(15), 80), expected);
        assert_eq!(DexUtils::format_amount_safe(U256::ZERO, 200), "0");
    }

    #[test]
    fn test_format_price() {
        // 25.1 USDC for 10 LINK
        let ten_link = U256::from(10) * U256::from(10).pow(U256::from(18));
        assert_eq!(DexUtils::format_price(U256::from(25_100_000), 6, ten_link, 18).unwrap(), "2.51");

        assert_eq!(DexUtils::format_price(U256::from(1), 0, U256::from(3), 0).unwrap(), "0.333333");
        assert_eq!(DexUtils::format_price(U256::from(2), 0, U256::from(3), 0).unwrap(), "0.666667");
        assert_eq!(DexUtils::format_price(U256::from(12_345_678), 0, U256::from(1), 0).unwrap(), "12345700");
        assert_eq!(DexUtils::format_price(U256::from(9_999_995), 0, U256::from(10_000_000), 0).unwrap(), "1");
        assert_eq!(DexUtils::format_price(U256::from(1), 0, U256::from(1_000_000_000), 0).unwrap(), "0.000000001");
        assert_eq!(DexUtils::format_price(U256::ZERO, 6, U256::from(1), 6).unwrap(), "0");
        assert!(DexUtils::format_price(U256::from(1), 6, U256::ZERO, 6).is_err());
    }

    #[test]
    fn test_parse_address() {
        assert!(DexUtils::parse_address("0x779877A7B0D9E8603169DdbD7836e478b4624789").is_some());
        assert!(DexUtils::parse_address("0x779877a7b0d9e8603169ddbd7836e478b4624789").is_some());
        assert!(DexUtils::parse_address("779877A7B0D9E8603169DdbD7836e478b4624789").is_none());
        assert!(DexUtils::parse_address("0x1234").is_none());
        assert!(DexUtils::parse_address("LINK").is_none());
        assert!(DexUtils::parse_address("0x779877a7b0d9e8603169ddbd7836e478b462478g").is_none());
    }

    #[test]
    fn test_parse_address_enforces_checksum_on_mixed_case() {
        // LINK with the first two letters' case flipped
        assert!(DexUtils::parse_address("0x779877a7B0D9E8603169DdbD7836e478b4624789").is_none());
        assert!(DexUtils::parse_address("0x779877A7B0D9E8603169DDBD7836E478B4624789").is_none());
        assert_eq!(
            DexUtils::parse_address("0x779877A7B0D9E8603169DdbD7836e478b4624789"),
            DexUtils::parse_address("0x779877a7b0d9e8603169ddbd7836e478b4624789")
        );
        assert!(DexUtils::require_address("0x779877a7B0D9E8603169DdbD7836e478b4624789", "recipient").is_err());
    }

    #[test]
    fn test_slippage_calculation() {
        let amount = U256::from(1000);

        // 1% slippage (100 bps)
        let min_out = DexUtils::calculate_min_amount_out(amount, 100);
        assert_eq!(min_out, U256::from(990));

        // 0.5% slippage (50 bps)
        let min_out = DexUtils::calculate_min_amount_out(amount, 50);
        assert_eq!(min_out, U256::from(995));

        assert_eq!(DexUtils::calculate_max_amount_in(U256::from(1000), 50), U256::from(1005));
        // 1001 * 1.005 = 1006.005 rounds up
        assert_eq!(DexUtils::calculate_max_amount_in(U256::from(1001), 50), U256::from(1007));
    }

    #[test]
    fn test_parse_slippage_bps() {
        assert_eq!(DexUtils::parse_slippage_bps("0.5").unwrap(), 50);
        assert_eq!(DexUtils::parse_slippage_bps("1").unwrap(), 100);
        assert!(DexUtils::parse_slippage_bps("101").is_err());
        assert!(DexUtils::parse_slippage_bps("0.001").is_err());
    }

    #[test]
    fn test_validate_token_pair() {
        let a = Address::repeat_byte(0x12);
        let b = Address::repeat_byte(0x34);

        assert!(DexUtils::validate_token_pair_addresses(&a, &b).is_ok());
        assert!(DexUtils::validate_token_pair_addresses(&a, &a).is_err());
        assert!(DexUtils::validate_token_pair_addresses(&Address::ZERO, &b).is_err());
    }
}
