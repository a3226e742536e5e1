use regex::Regex;
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub attachment: Option<PathBuf>,
}

/// Splits an `@<path>` attachment token out of the title input. The first
/// token wins; every token is stripped from the title either way.
pub fn parse_task_input(input: &str) -> ParsedTask {
    let attachment_re = Regex::new(r"(?:^|\s)@(\S+)").unwrap();

    let mut attachment = None;

    for caps in attachment_re.captures_iter(input) {
        if attachment.is_none() {
            if let Some(path_match) = caps.get(1) {
                attachment = Some(PathBuf::from(path_match.as_str()));
            }
        }
    }

    let title = attachment_re.replace_all(input, " ").to_string();

    let title = Regex::new(r"\s+")
        .unwrap()
        .replace_all(&title, " ")
        .trim()
        .to_string();

    ParsedTask { title, attachment }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_attachment_in_middle() {
        let input = "Fix the porch @photos/porch.jpg before winter";
        let expected = ParsedTask {
            title: "Fix the porch before winter".to_string(),
            attachment: Some(PathBuf::from("photos/porch.jpg")),
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_with_attachment_at_end() {
        let input = "Paint the fence   @fence.png   ";
        let expected = ParsedTask {
            title: "Paint the fence".to_string(),
            attachment: Some(PathBuf::from("fence.png")),
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_without_attachment() {
        let input = "Water the   plants";
        let expected = ParsedTask {
            title: "Water the plants".to_string(),
            attachment: None,
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_with_multiple_attachments_keeps_first() {
        let input = "@one.png Compare shots @two.png side by side";
        let expected = ParsedTask {
            title: "Compare shots side by side".to_string(),
            attachment: Some(PathBuf::from("one.png")),
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_leaves_embedded_at_signs_alone() {
        let input = "Email sam@example.com about the launch";
        let expected = ParsedTask {
            title: "Email sam@example.com about the launch".to_string(),
            attachment: None,
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }
}
