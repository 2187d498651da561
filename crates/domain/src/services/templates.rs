//! Convocation letter templates.
//!
//! One template per recipient category. Placeholders use `{{name}}` syntax
//! and are substituted from the variable map; a template that renders to an
//! empty subject or body is a render error, never a silent empty send.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::RecipientType;

/// Errors raised while rendering a letter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template '{0}' rendered an empty subject")]
    EmptySubject(String),

    #[error("Template '{0}' rendered an empty body")]
    EmptyBody(String),
}

/// A letter template: stable name plus subject/body with placeholders.
#[derive(Debug, Clone, Copy)]
pub struct LetterTemplate {
    pub name: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

/// A rendered letter ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLetter {
    pub template_name: String,
    pub subject: String,
    pub body: String,
}

const CLUB_CONVOCATION: LetterTemplate = LetterTemplate {
    name: "club_convocation",
    subject: "Referee assignments for {{tournament_name}}",
    body: "\
Dear {{club_name}},

the referee committee has completed the assignments for {{tournament_name}}, \
scheduled from {{start_date}} to {{end_date}}.

Assigned referees:
{{referee_list}}

Please make the course and the tournament office available to the assigned \
referees on arrival.

Kind regards,
{{committee}}",
};

const REFEREE_CONVOCATION: LetterTemplate = LetterTemplate {
    name: "referee_convocation",
    subject: "Convocation: {{tournament_name}}",
    body: "\
Dear {{referee_name}},

you have been assigned to {{tournament_name}} at {{club_name}} \
({{zone_name}}), from {{start_date}} to {{end_date}}, with the role of \
{{role}}.

Please confirm your availability to the committee as soon as possible.

Kind regards,
{{committee}}",
};

const INSTITUTIONAL_NOTICE: LetterTemplate = LetterTemplate {
    name: "institutional_notice",
    subject: "Assignment notice: {{tournament_name}}",
    body: "\
For your records: referee assignments for {{tournament_name}} \
({{zone_name}}, {{start_date}} - {{end_date}}) have been completed and the \
convocation letters were dispatched to the club and the assigned referees.

{{committee}}",
};

/// Returns the letter template for a recipient category.
pub fn template_for(recipient_type: RecipientType) -> &'static LetterTemplate {
    match recipient_type {
        RecipientType::Club => &CLUB_CONVOCATION,
        RecipientType::Referee => &REFEREE_CONVOCATION,
        RecipientType::Institutional => &INSTITUTIONAL_NOTICE,
    }
}

/// Renders a template with the given variables. Unknown placeholders render
/// as empty strings; an empty subject or body after substitution is an error.
pub fn render(
    template: &LetterTemplate,
    variables: &BTreeMap<&str, String>,
) -> Result<RenderedLetter, TemplateError> {
    let subject = substitute(template.subject, variables);
    let body = substitute(template.body, variables);

    if subject.trim().is_empty() {
        return Err(TemplateError::EmptySubject(template.name.to_string()));
    }
    if body.trim().is_empty() {
        return Err(TemplateError::EmptyBody(template.name.to_string()));
    }

    Ok(RenderedLetter {
        template_name: template.name.to_string(),
        subject,
        body,
    })
}

fn substitute(text: &str, variables: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        match rest[start..].find("}}") {
            Some(end) => {
                let key = &rest[start + 2..start + end];
                if let Some(value) = variables.get(key.trim()) {
                    out.push_str(value);
                }
                rest = &rest[start + end + 2..];
            }
            None => {
                // Unterminated placeholder, keep the tail verbatim.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let rendered = render(
            template_for(RecipientType::Referee),
            &vars(&[
                ("referee_name", "Anna Bianchi"),
                ("tournament_name", "Open di Roma"),
                ("club_name", "GC Roma"),
                ("zone_name", "Zone 3"),
                ("start_date", "2024-06-01"),
                ("end_date", "2024-06-03"),
                ("role", "chief referee"),
                ("committee", "National Referee Committee"),
            ]),
        )
        .unwrap();

        assert_eq!(rendered.template_name, "referee_convocation");
        assert_eq!(rendered.subject, "Convocation: Open di Roma");
        assert!(rendered.body.contains("Anna Bianchi"));
        assert!(rendered.body.contains("chief referee"));
        assert!(!rendered.body.contains("{{"));
    }

    #[test]
    fn test_unknown_placeholder_renders_empty() {
        let rendered = render(
            template_for(RecipientType::Institutional),
            &vars(&[("tournament_name", "Open"), ("committee", "NRC")]),
        )
        .unwrap();
        assert!(rendered.body.contains("Open"));
        assert!(!rendered.body.contains("{{zone_name}}"));
    }

    #[test]
    fn test_empty_subject_is_an_error() {
        let template = LetterTemplate {
            name: "blank",
            subject: "{{missing}}",
            body: "some body",
        };
        let err = render(&template, &BTreeMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::EmptySubject("blank".to_string()));
    }

    #[test]
    fn test_empty_body_is_an_error() {
        let template = LetterTemplate {
            name: "blank_body",
            subject: "subject",
            body: "{{missing}}",
        };
        let err = render(&template, &BTreeMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::EmptyBody("blank_body".to_string()));
    }

    #[test]
    fn test_each_category_has_a_template() {
        assert_eq!(template_for(RecipientType::Club).name, "club_convocation");
        assert_eq!(template_for(RecipientType::Referee).name, "referee_convocation");
        assert_eq!(template_for(RecipientType::Institutional).name, "institutional_notice");
    }
}
