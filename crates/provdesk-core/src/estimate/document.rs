// Cost-estimate document parsing.
//
// The expected shape is a pricing-calculator export:
//
//   { "名前": "...",
//     "合計コスト": { "毎月": "$12.50" },
//     "グループ": { "サービス": [ { "サービス名": "A", "サービスのコスト": { "毎月": "$5.00" } } ] } }
//
// English-locale exports use different key names for the same fields; every
// lookup below tries each known spelling in turn. Missing fields degrade to
// placeholders or zero, but text that is not JSON at all is an error.

use serde_json::Value;

use super::amount::coerce_amount;
use super::EstimateError;

pub const UNNAMED_ESTIMATE: &str = "Unnamed estimate";
pub const UNKNOWN_SERVICE: &str = "Unknown service";

/// Alternative key paths, tried in order.
type KeyPaths = &'static [&'static [&'static str]];

const NAME_KEYS: KeyPaths = &[&["名前"], &["Name"], &["name"]];
const TOTAL_MONTHLY_KEYS: KeyPaths = &[
    &["合計コスト", "毎月"],
    &["Total Cost", "monthly"],
    &["totalCost", "monthly"],
];
const ITEMS_KEYS: KeyPaths = &[
    &["グループ", "サービス"],
    &["Groups", "Services"],
    &["groups", "services"],
];
const ITEM_NAME_KEYS: KeyPaths = &[&["サービス名"], &["Service Name"], &["serviceName"], &["name"]];
const ITEM_MONTHLY_KEYS: KeyPaths = &[
    &["サービスのコスト", "毎月"],
    &["Service Cost", "monthly"],
    &["serviceCost", "monthly"],
];

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub monthly_cost: f64,
}

/// A parsed upload. Built once per upload and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CostDocument {
    pub name: String,
    /// Total monthly cost in the source currency.
    pub total_monthly: f64,
    pub items: Vec<LineItem>,
}

impl CostDocument {
    pub fn items_total(&self) -> f64 {
        self.items.iter().map(|i| i.monthly_cost).sum()
    }
}

/// Parse uploaded text into a `CostDocument`.
///
/// A top-level total that coerces to zero (absent, unparseable, or a literal
/// zero) is replaced by the sum of the line items.
pub fn parse_document(text: &str) -> Result<CostDocument, EstimateError> {
    let root: Value = serde_json::from_str(text)?;

    let name = lookup_str(&root, NAME_KEYS)
        .unwrap_or(UNNAMED_ESTIMATE)
        .to_string();

    let items: Vec<LineItem> = lookup(&root, ITEMS_KEYS)
        .and_then(Value::as_array)
        .map(|list| list.iter().map(parse_item).collect())
        .unwrap_or_default();

    let stated_total = coerce_amount(lookup(&root, TOTAL_MONTHLY_KEYS));
    let total_monthly = if stated_total == 0.0 {
        items.iter().map(|i| i.monthly_cost).sum()
    } else {
        stated_total
    };

    Ok(CostDocument {
        name,
        total_monthly,
        items,
    })
}

fn parse_item(item: &Value) -> LineItem {
    LineItem {
        name: lookup_str(item, ITEM_NAME_KEYS)
            .unwrap_or(UNKNOWN_SERVICE)
            .to_string(),
        monthly_cost: coerce_amount(lookup(item, ITEM_MONTHLY_KEYS)),
    }
}

/// First value found under any of the alternative key paths.
fn lookup<'a>(root: &'a Value, paths: KeyPaths) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(root, |node, key| node.get(*key))
            .filter(|v| !v.is_null())
    })
}

/// Like `lookup`, but only accepts non-blank strings.
fn lookup_str<'a>(root: &'a Value, paths: KeyPaths) -> Option<&'a str> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(root, |node, key| node.get(*key))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
