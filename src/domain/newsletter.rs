use unicode_segmentation::UnicodeSegmentation;

const SUBJECT_LENGTH: (usize, usize) = (5, 200);
const BODY_LENGTH: (usize, usize) = (10, 10_000);

#[derive(Debug, Clone)]
pub struct NewsletterSubject(String);

#[derive(Debug, Clone)]
pub struct NewsletterBody(String);

fn check_length(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), String> {
    let length = value.trim().graphemes(true).count();

    if length < min || length > max {
        return Err(format!(
            "{} must be between {} and {} characters long, got {}",
            field, min, max, length
        ));
    }

    Ok(())
}

impl NewsletterSubject {
    pub fn parse(subject: String) -> Result<NewsletterSubject, String> {
        check_length("subject", &subject, SUBJECT_LENGTH)?;

        Ok(Self(subject.trim().to_string()))
    }
}

impl NewsletterBody {
    pub fn parse(html: String) -> Result<NewsletterBody, String> {
        check_length("html body", &html, BODY_LENGTH)?;

        Ok(Self(html.trim().to_string()))
    }
}

impl AsRef<str> for NewsletterSubject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NewsletterBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
