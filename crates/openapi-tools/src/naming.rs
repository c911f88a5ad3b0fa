//! Tool-name heuristics for `OpenAPI` operations.
//!
//! Priority: `operationId`, then a short summary, then method + path.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const MAX_SUMMARY_LEN: usize = 50;

static LOWER_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("boundary pattern is valid"));
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]").expect("non-word pattern is valid"));
static UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("underscore pattern is valid"));
static STOPWORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(a|an|the|on|at)\b").expect("stopword pattern is valid"));
static WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("word pattern is valid"));

/// Pick a tool name for one operation.
#[must_use]
pub fn generate_tool_name(
    operation_id: Option<&str>,
    summary: Option<&str>,
    method: &str,
    path: &str,
) -> String {
    if let Some(id) = operation_id.filter(|id| !id.trim().is_empty()) {
        let name = to_snake_case(id);
        if !name.is_empty() {
            return name;
        }
    }

    if let Some(name) = summary.and_then(name_from_summary) {
        return name;
    }

    name_from_method_and_path(method, path)
}

/// Name from a summary such as `"Get a user by ID"` -> `get_user_by_id`.
///
/// `None` for blank summaries, summaries over 50 characters, or summaries made only of
/// articles/prepositions.
#[must_use]
pub fn name_from_summary(summary: &str) -> Option<String> {
    if summary.trim().is_empty() || summary.chars().count() > MAX_SUMMARY_LEN {
        return None;
    }

    let cleaned = STOPWORDS.replace_all(summary, "");
    let words: Vec<&str> = WORDS.find_iter(&cleaned).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return None;
    }

    let name = to_snake_case(&words.join(" "));
    (!name.is_empty()).then_some(name)
}

/// Name from method and path, e.g. `GET /users/{id}` -> `get_user`.
#[must_use]
pub fn name_from_method_and_path(method: &str, path: &str) -> String {
    let method = method.to_ascii_uppercase();
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{') && !s.ends_with('}'))
        .map(str::to_string)
        .collect();

    if segments.is_empty() {
        return to_snake_case(&method.to_ascii_lowercase());
    }

    let has_parameters = path.contains('{');
    let action = match method.as_str() {
        "GET" if has_parameters => "get".to_string(),
        "GET" => "list".to_string(),
        "POST" => "create".to_string(),
        "PUT" | "PATCH" => "update".to_string(),
        "DELETE" => "delete".to_string(),
        other => other.to_ascii_lowercase(),
    };

    match method.as_str() {
        "GET" if has_parameters => segments[0] = singularize(&segments[0]),
        "POST" | "PUT" | "PATCH" | "DELETE" => {
            if let Some(last) = segments.last_mut() {
                *last = singularize(last);
            }
        }
        _ => {}
    }

    to_snake_case(&format!("{action}_{}", segments.join("_")))
}

/// Lowercase singular form using basic English rules.
#[must_use]
pub fn singularize(word: &str) -> String {
    if word.trim().is_empty() {
        return word.to_string();
    }

    let word = word.to_lowercase();
    let len = word.len();

    if len > 3 && word.ends_with("ies") {
        return format!("{}y", &word[..len - 3]);
    }
    if len > 3 && word.ends_with("ves") {
        let stem = &word[..len - 3];
        return if stem.ends_with('i') {
            format!("{stem}fe")
        } else {
            format!("{stem}f")
        };
    }
    if len > 3 && word.ends_with("ses") {
        return word[..len - 2].to_string();
    }
    if len > 3 && (word.ends_with("xes") || word.ends_with("ches") || word.ends_with("shes")) {
        return word[..len - 2].to_string();
    }
    if len > 1 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..len - 1].to_string();
    }

    word
}

/// `GetUserById` / `get-user by id` -> `get_user_by_id`.
#[must_use]
pub fn to_snake_case(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let split = LOWER_UPPER.replace_all(text, "${1}_${2}");
    let lower = split.to_lowercase();
    let replaced = NON_WORD.replace_all(&lower, "_");
    let collapsed = UNDERSCORES.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Reserve `base`, or `base_1`, `base_2`, ... if it is already taken.
pub fn reserve_unique_name(taken: &mut HashSet<String>, base: &str) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{base}_{counter}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_ids_are_snake_cased() {
        assert_eq!(to_snake_case("GetUserById"), "get_user_by_id");
        assert_eq!(to_snake_case("listAllUsers"), "list_all_users");
        assert_eq!(to_snake_case("CreateNewUser"), "create_new_user");
        assert_eq!(to_snake_case("find-pets.byStatus"), "find_pets_by_status");
        assert_eq!(to_snake_case("__already_snake__"), "already_snake");
    }

    #[test]
    fn summaries_drop_articles_only() {
        assert_eq!(
            name_from_summary("Get user by ID").as_deref(),
            Some("get_user_by_id")
        );
        assert_eq!(
            name_from_summary("Create a new user").as_deref(),
            Some("create_new_user")
        );
        assert_eq!(
            name_from_summary("List all users").as_deref(),
            Some("list_all_users")
        );
        assert_eq!(name_from_summary("Delete user").as_deref(), Some("delete_user"));
        assert_eq!(
            name_from_summary("Fetch user details").as_deref(),
            Some("fetch_user_details")
        );
        assert_eq!(
            name_from_summary("Send an email to the owner").as_deref(),
            Some("send_email_to_owner")
        );
    }

    #[test]
    fn unusable_summaries_fall_through() {
        assert_eq!(name_from_summary(""), None);
        assert_eq!(name_from_summary("   "), None);
        assert_eq!(name_from_summary("The a an on at"), None);
        assert_eq!(
            name_from_summary("This summary is definitely much longer than fifty characters"),
            None
        );
    }

    #[test]
    fn method_and_path_fallback() {
        assert_eq!(name_from_method_and_path("GET", "/users"), "list_users");
        assert_eq!(name_from_method_and_path("GET", "/users/{id}"), "get_user");
        assert_eq!(name_from_method_and_path("POST", "/users"), "create_user");
        assert_eq!(name_from_method_and_path("DELETE", "/users/{id}"), "delete_user");
        assert_eq!(
            name_from_method_and_path("GET", "/users/{id}/posts"),
            "get_user_posts"
        );
        assert_eq!(
            name_from_method_and_path("GET", "/categories/{id}"),
            "get_category"
        );
        assert_eq!(
            name_from_method_and_path("PUT", "/addresses/{id}"),
            "update_address"
        );
        assert_eq!(name_from_method_and_path("GET", "/items"), "list_items");
        assert_eq!(name_from_method_and_path("PATCH", "/boxes/{id}"), "update_box");
        assert_eq!(name_from_method_and_path("HEAD", "/status"), "head_status");
        assert_eq!(name_from_method_and_path("GET", "/{id}"), "get");
        assert_eq!(name_from_method_and_path("post", "/"), "post");
    }

    #[test]
    fn singular_forms() {
        assert_eq!(singularize("Categories"), "category");
        assert_eq!(singularize("wolves"), "wolf");
        assert_eq!(singularize("knives"), "knife");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("matches"), "match");
        assert_eq!(singularize("wishes"), "wish");
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("status"), "statu");
        assert_eq!(singularize("access"), "access");
        assert_eq!(singularize("s"), "s");
    }

    #[test]
    fn priority_order() {
        assert_eq!(
            generate_tool_name(Some("getPetById"), Some("Find pet"), "GET", "/pets/{id}"),
            "get_pet_by_id"
        );
        assert_eq!(
            generate_tool_name(None, Some("Find pet"), "GET", "/pets/{id}"),
            "find_pet"
        );
        assert_eq!(
            generate_tool_name(Some("  "), Some("the"), "GET", "/pets/{id}"),
            "get_pet"
        );
    }

    #[test]
    fn unique_names_get_numeric_suffixes() {
        let mut taken = HashSet::new();
        assert_eq!(reserve_unique_name(&mut taken, "list_users"), "list_users");
        assert_eq!(reserve_unique_name(&mut taken, "list_users"), "list_users_1");
        assert_eq!(reserve_unique_name(&mut taken, "list_users"), "list_users_2");
    }
}
