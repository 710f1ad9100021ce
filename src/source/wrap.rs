//! Turning an author's function body into a runnable program
//!
//! The wrapped form is line-aligned with the original after a fixed header:
//!
//! ```text
//! function __stepwise_main__(bindings) {   <- header line
//! ...original body, verbatim...
//! }
//! __stepwise_main__(bindings);
//! ```

/// Name of the function the body is wrapped in
pub const ENTRY_FUNCTION: &str = "__stepwise_main__";

/// Lines prepended before the original body
pub const HEADER_LINES: usize = 1;

/// Wrap `body` so it runs as the body of a function taking `bindings_name`
pub fn wrap(body: &str, bindings_name: &str) -> String {
    let body = body.strip_suffix('\n').unwrap_or(body);
    format!(
        "function {ENTRY_FUNCTION}({bindings_name}) {{\n{body}\n}}\n\
         {ENTRY_FUNCTION}({bindings_name});\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_starts_after_header() {
        let wrapped = wrap("var x = 1;\nreturn x;\n", "bindings");
        let lines: Vec<&str> = wrapped.lines().collect();
        assert_eq!(lines[HEADER_LINES], "var x = 1;");
        assert_eq!(lines[HEADER_LINES + 1], "return x;");
        assert_eq!(lines.last().copied(), Some("__stepwise_main__(bindings);"));
    }

    #[test]
    fn test_wrapped_source_parses() {
        let wrapped = wrap("let total = bindings.n * 2;\nreturn total;", "bindings");
        assert!(crate::parser::parse(&wrapped).is_ok());
    }
}
