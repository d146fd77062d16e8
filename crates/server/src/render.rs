//! HTML for the form page.
//!
//! One page: the input form, then either the recommendation or the error
//! message. Every value that came from a request or an artifact is escaped.

use std::collections::HashMap;
use std::fmt::Write;

use pipeline::{Field, ImagePreview, RecommendError};

use crate::orchestrator::CropRecommendation;

/// What to show under the form
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Recommended(&'a CropRecommendation),
    Failed(&'a RecommendError),
}

/// Form values keyed by `Field::key`, filled with the field defaults
pub fn default_values() -> HashMap<String, String> {
    Field::FORM_ORDER
        .iter()
        .map(|field| (field.key().to_string(), field.bounds().default.to_string()))
        .collect()
}

/// Escape text for use in HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// The full page
pub fn page(values: &HashMap<String, String>, outcome: Option<Outcome<'_>>) -> String {
    let mut html = String::new();
    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Crop Recommendation System</title>\n\
         <style>\
         body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
         label{display:block;margin-top:.75rem}\
         .result{background:#eef7ee;padding:1rem;margin-top:1.5rem}\
         .error{background:#fbeaea;padding:1rem;margin-top:1.5rem}\
         .info{color:#555}\
         .warning{color:#8a5a00}\
         img{max-width:100%}\
         </style>\n</head>\n<body>\n\
         <h1>Crop Recommendation System</h1>\n\
         <p>Enter the soil and weather conditions of your field to get a crop recommendation.</p>\n",
    );

    render_form(&mut html, values);

    match outcome {
        Some(Outcome::Recommended(rec)) => render_recommendation(&mut html, rec),
        Some(Outcome::Failed(err)) => render_error(&mut html, err),
        None => {}
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_form(html: &mut String, values: &HashMap<String, String>) {
    html.push_str("<form method=\"post\" action=\"/recommend\">\n");
    for field in Field::FORM_ORDER {
        let bounds = field.bounds();
        let value = values.get(field.key()).map(String::as_str).unwrap_or("");
        let unit = match field.unit() {
            "" => String::new(),
            unit => format!(" ({})", unit),
        };
        // writing into a String cannot fail
        let _ = writeln!(
            html,
            "<label>{label}{unit} \
             <input type=\"number\" name=\"{key}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\">\
             </label>",
            label = escape(field.label()),
            unit = escape(&unit),
            key = field.key(),
            min = bounds.min,
            max = bounds.max,
            step = field.step(),
            value = escape(value),
        );
    }
    html.push_str("<p><button type=\"submit\">Predict Crop</button></p>\n</form>\n");
}

fn render_recommendation(html: &mut String, rec: &CropRecommendation) {
    let _ = writeln!(
        html,
        "<section class=\"result\">\n<h2>Recommended Crop</h2>\n<h3>{}</h3>",
        escape(&rec.headline)
    );

    match &rec.preview {
        ImagePreview::Available { file_name, .. } => {
            let _ = writeln!(
                html,
                "<img src=\"/images/{}\" alt=\"{}\">",
                escape(file_name),
                escape(&rec.crop)
            );
        }
        ImagePreview::Unavailable { message } => {
            let _ = writeln!(html, "<p class=\"info\">{}</p>", escape(message));
        }
        ImagePreview::Unreadable { message } => {
            let _ = writeln!(html, "<p class=\"warning\">{}</p>", escape(message));
        }
    }

    let _ = writeln!(
        html,
        "<details open>\n<summary>About this recommendation</summary>\n<pre>{}</pre>\n</details>",
        escape(&rec.explanation)
    );
    render_reset(html);
    html.push_str("</section>\n");
}

fn render_error(html: &mut String, err: &RecommendError) {
    let _ = writeln!(
        html,
        "<section class=\"error\">\n<p>{}</p>",
        escape(&err.user_message())
    );
    render_reset(html);
    html.push_str("</section>\n");
}

fn render_reset(html: &mut String) {
    html.push_str("<p><a href=\"/reset\">Make Another Prediction</a></p>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{FieldViolation, SoilWeatherSample, ValidationError, ViolationKind};

    fn recommendation(preview: ImagePreview) -> CropRecommendation {
        CropRecommendation {
            crop: "rice".into(),
            headline: "RICE".into(),
            explanation: "This recommendation is based on the following conditions:".into(),
            preview,
            sample: SoilWeatherSample::default(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#39;y&#39;&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_blank_page_has_defaults_and_no_result() {
        let html = page(&default_values(), None);

        assert!(html.contains("name=\"ph\" min=\"3\" max=\"10\" step=\"0.1\" value=\"6.5\""));
        assert!(html.contains("name=\"nitrogen\" min=\"0\" max=\"140\" step=\"1\" value=\"50\""));
        assert!(!html.contains("class=\"result\""));
        assert!(!html.contains("/reset"));
    }

    #[test]
    fn test_submitted_values_are_escaped() {
        let mut values = default_values();
        values.insert("ph".into(), "\"><b>".into());

        let html = page(&values, None);
        assert!(html.contains("value=\"&quot;&gt;&lt;b&gt;\""));
    }

    #[test]
    fn test_recommendation_with_image() {
        let rec = recommendation(ImagePreview::Available {
            path: "crop_images/rice.jpg".into(),
            file_name: "rice.jpg".into(),
        });

        let html = page(&default_values(), Some(Outcome::Recommended(&rec)));
        assert!(html.contains("<h3>RICE</h3>"));
        assert!(html.contains("<img src=\"/images/rice.jpg\" alt=\"rice\">"));
        assert!(html.contains("About this recommendation"));
        assert!(html.contains("href=\"/reset\""));
    }

    #[test]
    fn test_recommendation_without_image() {
        let rec = recommendation(ImagePreview::Unavailable {
            message: "No preview available for rice".into(),
        });

        let html = page(&default_values(), Some(Outcome::Recommended(&rec)));
        assert!(html.contains("<p class=\"info\">No preview available for rice</p>"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_unreadable_image_shows_warning_not_img() {
        let rec = recommendation(ImagePreview::Unreadable {
            message: "Couldn't load crop image".into(),
        });

        let html = page(&default_values(), Some(Outcome::Recommended(&rec)));
        assert!(html.contains("<p class=\"warning\">Couldn&#39;t load crop image</p>"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_error_message_and_reset_link() {
        let err = RecommendError::Validation(ValidationError {
            violations: vec![FieldViolation {
                field: Field::Ph,
                kind: ViolationKind::OutOfRange {
                    value: 15.0,
                    min: 3.0,
                    max: 10.0,
                },
            }],
        });

        let html = page(&default_values(), Some(Outcome::Failed(&err)));
        assert!(html.contains("class=\"error\""));
        assert!(html.contains("Please check your inputs: pH = 15"));
        assert!(html.contains("href=\"/reset\""));
    }
}
