//! Identifier case conversion: internal snake_case field names -> external camelCase names,
//! entity names -> PascalCase type names, and a small plural -> singular inflection.

/// Convert a single identifier from snake_case to camelCase.
/// e.g. "category_id" -> "categoryId", "long_text" -> "longText"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = !out.is_empty();
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// "blog_post" -> "BlogPost"
pub fn to_pascal_case(s: &str) -> String {
    let camel = to_camel_case(s);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Naive English singular for table names: "categories" -> "category", "statuses" -> "status",
/// "pages" -> "page". Names that do not look plural are returned unchanged.
pub fn singularize(s: &str) -> String {
    if let Some(stem) = s.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "shes", "ches", "xes", "uses"] {
        if s.ends_with(suffix) {
            return s[..s.len() - 2].to_string();
        }
    }
    if s.ends_with("ss") || s.ends_with("us") || s.ends_with("is") {
        return s.to_string();
    }
    match s.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => s.to_string(),
    }
}
