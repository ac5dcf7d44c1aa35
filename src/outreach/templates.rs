//! Email templates and placeholder rendering.
//!
//! Placeholders are `{field}` names resolved against the contact after
//! optional fields are defaulted. Anything left unresolved fails the render.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::campaign::Stage;
use crate::campaign::contact::Contact;
use crate::error::{ConfigError, TemplateError};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("placeholder pattern is valid"));

/// Interest used when a contact has none on file.
pub const DEFAULT_INTEREST: &str = "digital transformation";

const INITIAL_TEMPLATE: &str = "\
Subject: Modernizing {industry} Operations at {company}

Hi {contact_name},

I noticed {company} {recent_news}. At Matherson and Sons, we specialize in helping {industry} companies like yours optimize operations through digital transformation.

Would you be open to a 15-minute chat about how we've helped similar {industry} companies achieve 30%+ operational efficiency gains?

Best,
Alex Matherson
Matherson and Sons
";

const FOLLOWUP_TEMPLATE: &str = "\
Subject: Re: Modernizing {industry} Operations at {company}

Hi {contact_name},

I wanted to follow up on my previous email about helping {company} optimize operations through strategic digital transformation.

Many {industry} companies we work with were initially hesitant until they saw our case studies. I'd be happy to share how we helped a {company_size} {industry} company achieve significant ROI within 6 months.

Would you have 15 minutes this week for a quick call?

Best,
Alex Matherson
Matherson and Sons
";

const PERSONALIZED_TEMPLATE: &str = "\
Subject: Your LinkedIn post on {interest}

Hi {contact_name},

I noticed your recent LinkedIn activity around {interest}, and it resonated with the work we're doing at Matherson and Sons.

Given your role as {role} at {company}, I thought you might be interested in how we're helping {industry} companies implement {interest} solutions that deliver measurable ROI.

I have a specific idea for {company} based on your recent initiatives. Would you be open to a brief discussion?

Best,
Alex Matherson
Matherson and Sons
";

/// Registry of named templates.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, String>,
}

impl TemplateRegistry {
    /// Registry with the three stage templates.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Stage::Initial.template_id(), INITIAL_TEMPLATE);
        registry.register(Stage::Followup.template_id(), FOLLOWUP_TEMPLATE);
        registry.register(Stage::Personalized.template_id(), PERSONALIZED_TEMPLATE);
        registry
    }

    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Register or replace a template.
    pub fn register(&mut self, id: impl Into<String>, body: impl Into<String>) {
        self.templates.insert(id.into(), body.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Startup check that every stage can be rendered.
    pub fn validate_stages(&self) -> Result<(), ConfigError> {
        for stage in Stage::ALL {
            if !self.contains(stage.template_id()) {
                return Err(ConfigError::MissingStageTemplate(stage));
            }
        }
        Ok(())
    }

    /// Render `template_id` for `contact`.
    pub fn render(&self, template_id: &str, contact: &Contact) -> Result<String, TemplateError> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| TemplateError::UnknownTemplate(template_id.to_string()))?;

        if let Some(missing) = PLACEHOLDER
            .captures_iter(template)
            .map(|caps| caps[1].to_string())
            .find(|field| field_value(contact, field).is_none())
        {
            return Err(TemplateError::Render {
                template: template_id.to_string(),
                field: missing,
            });
        }

        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
            field_value(contact, &caps[1]).unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Resolve a placeholder, applying defaults for optional fields.
fn field_value(contact: &Contact, field: &str) -> Option<String> {
    match field {
        "contact_name" | "name" => Some(contact.name.clone()),
        "company" => Some(contact.company.clone()),
        "role" => Some(contact.role.clone()),
        "email" => Some(contact.email.clone()),
        "industry" => Some(contact.industry.clone()),
        "company_size" => contact.company_size.clone(),
        "website" => contact.website.clone(),
        "recent_news" => Some(
            contact
                .recent_news
                .clone()
                .unwrap_or_else(|| format!("is in the {} sector", contact.industry)),
        ),
        "interest" => Some(
            contact
                .interests
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_INTEREST.to_string()),
        ),
        "last_activity" => contact.last_activity.clone(),
        _ => None,
    }
}

/// Split a rendered email into its subject line and body.
pub fn split_subject(rendered: &str) -> (Option<&str>, &str) {
    match rendered.split_once('\n') {
        Some((first, rest)) if first.starts_with("Subject: ") => {
            (Some(&first["Subject: ".len()..]), rest.trim_start_matches('\n'))
        }
        _ => (None, rendered),
    }
}
