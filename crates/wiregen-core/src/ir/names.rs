//! Name mangling shared by both emitters.
//!
//! Both targets must agree on how proto identifiers map onto generated
//! names, so the conversions live here in the IR layer rather than in the
//! emitters.
//!
//! | Input | Function | Output |
//! |-------|----------|--------|
//! | `item_id` | [`go_name`] | `ItemID` |
//! | `item_id` | [`js_name`] | `itemId` |
//! | `itemId` | [`json_snake_case`] | `item_id` |

/// Convert a proto identifier to the Go naming convention.
///
/// Splits on `_`/`-` and on lower-to-upper case boundaries, capitalizes
/// each segment, and joins. A trailing segment equal to exactly `id`
/// (case-insensitive) collapses to `ID`; a non-trailing `id` stays `Id`.
///
/// # Examples
///
/// ```
/// use wiregen_core::ir::names::go_name;
///
/// assert_eq!(go_name("item_id"), "ItemID");
/// assert_eq!(go_name("clientFlipId"), "ClientFlipID");
/// assert_eq!(go_name("id_value"), "IdValue");
/// ```
pub fn go_name(proto_name: &str) -> String {
    let parts = split_parts(proto_name);
    let last = parts.len().saturating_sub(1);
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            if i == last && part == "id" {
                "ID".to_string()
            } else {
                title(part)
            }
        })
        .collect()
}

/// Convert a proto identifier to the JavaScript naming convention.
///
/// Splits like [`go_name`], lowercases the first segment, capitalizes the
/// rest. The `ID` rule is never applied.
///
/// # Examples
///
/// ```
/// use wiregen_core::ir::names::js_name;
///
/// assert_eq!(js_name("item_id"), "itemId");
/// assert_eq!(js_name("Id_value"), "idValue");
/// ```
pub fn js_name(proto_name: &str) -> String {
    let parts = split_parts(proto_name);
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| if i == 0 { part.clone() } else { title(part) })
        .collect()
}

/// Convert a camelCase identifier to the snake_case JSON tag form.
///
/// Inserts an underscore before every interior capital letter, lowercases
/// everything, and maps `-` to `_`.
pub fn json_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c == '-' {
            out.push('_');
            continue;
        }
        if i > 0 && c.is_uppercase() {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Split an identifier into lowercase segments.
///
/// Breaks on `_`/`-` separators and on lower-to-upper transitions so that
/// snake_case, kebab-case, and camelCase inputs all segment the same way.
fn split_parts(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Capitalize the first character of a segment.
fn title(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_name_id_suffix() {
        let tests = [
            ("id", "ID"),
            ("item_id", "ItemID"),
            ("command_id", "CommandID"),
            ("clientFlipId", "ClientFlipID"),
            ("id_value", "IdValue"),
        ];
        for (input, want) in tests {
            assert_eq!(go_name(input), want, "go_name({:?})", input);
        }
    }

    #[test]
    fn test_go_name_basic() {
        assert_eq!(go_name(""), "");
        assert_eq!(go_name("name"), "Name");
        assert_eq!(go_name("audit_event"), "AuditEvent");
        assert_eq!(go_name("Order_Item"), "OrderItem");
        assert_eq!(go_name("utf8_text"), "Utf8Text");
    }

    #[test]
    fn test_js_name() {
        assert_eq!(js_name("item_id"), "itemId");
        assert_eq!(js_name("Id_value"), "idValue");
        assert_eq!(js_name("simple"), "simple");
        assert_eq!(js_name("my-field-name"), "myFieldName");
        // No ID rule in JS names
        assert_eq!(js_name("item_id"), "itemId");
    }

    #[test]
    fn test_json_snake_case() {
        assert_eq!(json_snake_case("itemId"), "item_id");
        assert_eq!(json_snake_case("clientFlipId"), "client_flip_id");
        assert_eq!(json_snake_case("already_snake"), "already_snake");
        assert_eq!(json_snake_case("kebab-case"), "kebab_case");
        assert_eq!(json_snake_case(""), "");
    }

    #[test]
    fn test_split_handles_consecutive_separators() {
        assert_eq!(go_name("foo__bar"), "FooBar");
        assert_eq!(go_name("_leading"), "Leading");
        assert_eq!(go_name("trailing_"), "Trailing");
    }
}
