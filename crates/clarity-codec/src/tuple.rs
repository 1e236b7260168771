//! Named-field access over decoded tuples
//!
//! `TupleFields` gives strict lookups that return `None` when a field is
//! missing or has an unexpected type. The `find_*` functions layer the
//! lenient behavior record assembly relies on: a missing field reads as
//! `0`, `""` or `None`, and the miss is logged at debug level.

use tracing::debug;

use crate::value::{ClarityValue, Principal};

/// Borrowed view over the entries of a tuple value
#[derive(Debug, Clone, Copy)]
pub struct TupleFields<'a> {
    entries: &'a [(String, ClarityValue)],
}

impl<'a> TupleFields<'a> {
    /// View a value as a tuple, looking through `(some ..)` and `(ok ..)`
    pub fn from_value(value: &'a ClarityValue) -> Option<Self> {
        match value.unwrap_some_ok() {
            ClarityValue::Tuple(entries) => Some(Self { entries }),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a ClarityValue> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn uint(&self, name: &str) -> Option<u128> {
        self.get(name)?.as_uint()
    }

    pub fn ascii(&self, name: &str) -> Option<&'a str> {
        match self.get(name)? {
            ClarityValue::StringAscii(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn principal(&self, name: &str) -> Option<&'a Principal> {
        self.get(name)?.as_principal()
    }

    /// `Some(None)` for an explicit `none`, `Some(Some(p))` for `(some p)`,
    /// `None` when the field is missing or holds something else.
    pub fn optional_principal(&self, name: &str) -> Option<Option<&'a Principal>> {
        match self.get(name)? {
            ClarityValue::OptionalNone => Some(None),
            ClarityValue::OptionalSome(inner) => inner.as_principal().map(Some),
            ClarityValue::Principal(p) => Some(Some(p)),
            _ => None,
        }
    }
}

fn anomaly(field: &str, expected: &'static str, tuple: &ClarityValue) {
    debug!(
        field,
        expected,
        found = tuple.unwrap_some_ok().type_name(),
        "Field missing or mistyped, using default"
    );
}

/// Unsigned integer field, or `0` when absent
pub fn find_unsigned_int(tuple: &ClarityValue, field: &str) -> u128 {
    match TupleFields::from_value(tuple).and_then(|t| t.uint(field)) {
        Some(v) => v,
        None => {
            anomaly(field, "uint", tuple);
            0
        }
    }
}

/// ASCII string field, or `""` when absent
pub fn find_ascii_string(tuple: &ClarityValue, field: &str) -> String {
    match TupleFields::from_value(tuple).and_then(|t| t.ascii(field)) {
        Some(s) => s.to_string(),
        None => {
            anomaly(field, "string-ascii", tuple);
            String::new()
        }
    }
}

fn display_address(field: &str, principal: &Principal) -> Option<String> {
    match principal.to_address() {
        Ok(address) => Some(address),
        Err(e) => {
            debug!(field, version = principal.version, error = %e, "Principal has no display form");
            None
        }
    }
}

/// Account principal field as a c32check address, or `None` when absent
pub fn find_account_principal(tuple: &ClarityValue, field: &str) -> Option<String> {
    match TupleFields::from_value(tuple).and_then(|t| t.principal(field)) {
        Some(p) => display_address(field, p),
        None => {
            anomaly(field, "principal", tuple);
            None
        }
    }
}

/// Optional principal field: `None` for an explicit `none`, when absent and
/// when the principal cannot be displayed
pub fn find_optional_principal(tuple: &ClarityValue, field: &str) -> Option<String> {
    match TupleFields::from_value(tuple).and_then(|t| t.optional_principal(field)) {
        Some(p) => p.and_then(|p| display_address(field, p)),
        None => {
            anomaly(field, "optional principal", tuple);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::decode_hex;

    const BORROWER: [u8; 20] = [0x11; 20];

    fn loan_tuple() -> ClarityValue {
        ClarityValue::OptionalSome(Box::new(ClarityValue::Tuple(vec![
            ("collateral-amount".into(), ClarityValue::UInt(100_000_000)),
            ("borrow-amount".into(), ClarityValue::UInt(50_000_000)),
            ("zero-field".into(), ClarityValue::UInt(0)),
            ("status".into(), ClarityValue::StringAscii("active".into())),
            (
                "borrower".into(),
                ClarityValue::Principal(Principal::standard(26, BORROWER)),
            ),
            ("lender".into(), ClarityValue::OptionalNone),
            (
                "bidder".into(),
                ClarityValue::OptionalSome(Box::new(ClarityValue::Principal(
                    Principal::standard(26, [0u8; 20]),
                ))),
            ),
        ])))
    }

    #[test]
    fn test_present_fields_decode_exactly() {
        let tuple = decode_hex(&loan_tuple().to_hex().unwrap()).unwrap();
        assert_eq!(find_unsigned_int(&tuple, "collateral-amount"), 100_000_000);
        assert_eq!(find_unsigned_int(&tuple, "borrow-amount"), 50_000_000);
        assert_eq!(find_ascii_string(&tuple, "status"), "active");
        assert_eq!(
            find_account_principal(&tuple, "borrower"),
            Some(crate::c32_address(26, &BORROWER).unwrap())
        );
        assert_eq!(find_optional_principal(&tuple, "lender"), None);
        assert_eq!(
            find_optional_principal(&tuple, "bidder").as_deref(),
            Some("ST000000000000000000002AMW42H")
        );
    }

    #[test]
    fn test_absent_fields_use_defaults() {
        let tuple = loan_tuple();
        assert_eq!(find_unsigned_int(&tuple, "max-repayment"), 0);
        assert_eq!(find_ascii_string(&tuple, "borrow-asset"), "");
        assert_eq!(find_account_principal(&tuple, "lender"), None);
        assert_eq!(find_optional_principal(&tuple, "nobody"), None);
    }

    #[test]
    fn test_mistyped_field_uses_default() {
        let tuple = loan_tuple();
        assert_eq!(find_unsigned_int(&tuple, "status"), 0);
        assert_eq!(find_ascii_string(&tuple, "borrow-amount"), "");
    }

    #[test]
    fn test_strict_view_distinguishes_zero_from_absent() {
        let tuple = loan_tuple();
        let fields = TupleFields::from_value(&tuple).unwrap();
        assert_eq!(fields.uint("zero-field"), Some(0));
        assert_eq!(fields.uint("missing"), None);
        assert_eq!(fields.optional_principal("lender"), Some(None));
        assert!(fields.get("bidder").is_some());
    }

    #[test]
    fn test_non_tuple_values() {
        let none = ClarityValue::OptionalNone;
        assert!(TupleFields::from_value(&none).is_none());
        assert_eq!(find_unsigned_int(&none, "amount"), 0);
        assert_eq!(find_account_principal(&none, "bidder"), None);
    }

    #[test]
    fn test_ok_wrapped_tuple() {
        let value = ClarityValue::ResponseOk(Box::new(loan_tuple()));
        assert_eq!(find_ascii_string(&value, "status"), "active");
    }

    #[test]
    fn test_wide_principal_version_reads_as_absent() {
        let tuple = ClarityValue::Tuple(vec![
            (
                "borrower".into(),
                ClarityValue::Principal(Principal::standard(0x80, BORROWER)),
            ),
            (
                "lender".into(),
                ClarityValue::OptionalSome(Box::new(ClarityValue::Principal(
                    Principal::standard(0x80, BORROWER),
                ))),
            ),
        ]);
        assert_eq!(find_account_principal(&tuple, "borrower"), None);
        assert_eq!(find_optional_principal(&tuple, "lender"), None);
    }
}
