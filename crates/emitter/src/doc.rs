/// Captures a leading run of `%`-comment lines as the file's documentation
/// block (spec.md §4.7 "the captured documentation block" / §6 "a
/// help-documentation sidecar whose content is the captured doc comment").
///
/// The scanner discards comment text entirely (spec.md §4.1), so this walks
/// the raw source directly rather than the token stream: only the emitter
/// needs this text, and only once, so there is no reason to keep it live
/// through the whole pipeline.
pub fn capture_doc_comment(source: &str) -> Option<String> {
    let mut lines = Vec::new();
    for raw_line in source.lines() {
        let trimmed = raw_line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('%') {
            if rest.starts_with('{') || rest.starts_with('}') {
                break;
            }
            lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            continue;
        }
        break;
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn captures_leading_comment_lines() {
        let source = "% Computes the square of x.\n% Returns the result.\nfunction r = sq(x)\nr = x*x;\nend\n";
        assert_eq!(capture_doc_comment(source).as_deref(), Some("Computes the square of x.\nReturns the result."));
    }

    #[test]
    fn returns_none_without_a_leading_comment() {
        let source = "x = 1;\n";
        assert_eq!(capture_doc_comment(source), None);
    }

    #[test]
    fn stops_at_a_block_comment_opener() {
        let source = "%{\nnot captured\n%}\nx = 1;\n";
        assert_eq!(capture_doc_comment(source), None);
    }
}
