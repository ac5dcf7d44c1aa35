//! Lead source: industry, region and role filters in, contacts out.

use std::collections::HashSet;

use tracing::info;

use crate::campaign::contact::Contact;

/// Filters for a lead search.
#[derive(Debug, Clone, Default)]
pub struct LeadQuery {
    /// Comma-separated industry keywords, matched case-insensitively.
    pub industry_filter: String,
    /// Empty matches every region.
    pub region: String,
    /// Empty matches every role.
    pub role_filter: Vec<String>,
}

impl LeadQuery {
    pub fn new(
        industry_filter: impl Into<String>,
        region: impl Into<String>,
        role_filter: Vec<String>,
    ) -> Self {
        Self {
            industry_filter: industry_filter.into(),
            region: region.into(),
            role_filter,
        }
    }

    fn matches_industry(&self, industry: &str) -> bool {
        self.industry_filter
            .to_lowercase()
            .contains(&industry.to_lowercase())
    }

    fn matches_region(&self, region: &str) -> bool {
        let wanted = self.region.trim();
        wanted.is_empty() || region.to_lowercase().contains(&wanted.to_lowercase())
    }

    fn matches_role(&self, role: &str) -> bool {
        if self.role_filter.is_empty() {
            return true;
        }
        let role = role.to_lowercase();
        self.role_filter
            .iter()
            .any(|wanted| role.contains(&wanted.to_lowercase()))
    }
}

/// Something that can produce leads. Must be side-effect free.
pub trait LeadSource: Send + Sync {
    fn find_contacts(&self, query: &LeadQuery) -> Vec<Contact>;
}

/// A person listed under a company in the directory.
#[derive(Debug, Clone)]
pub struct DirectoryPerson {
    pub name: String,
    pub role: String,
    pub email: String,
    pub linkedin_url: String,
}

/// A company and its listed people.
#[derive(Debug, Clone)]
pub struct DirectoryCompany {
    pub name: String,
    pub industry: String,
    pub region: String,
    pub website: String,
    pub size: String,
    pub people: Vec<DirectoryPerson>,
}

/// In-memory company directory standing in for LinkedIn/Apollo lookups.
#[derive(Debug, Clone)]
pub struct MockDirectory {
    companies: Vec<DirectoryCompany>,
}

impl MockDirectory {
    pub fn new(companies: Vec<DirectoryCompany>) -> Self {
        Self { companies }
    }

    /// The bundled sample of Australian manufacturing and construction firms.
    pub fn sample() -> Self {
        Self::new(vec![
            company(
                "Aussie Manufacturing Co",
                "Manufacturing",
                "www.aussiemfg.com.au",
                "50-200 employees",
                &[
                    ("John Doe", "CFO", "john.doe@example.com", "johndoe"),
                    (
                        "Sarah Wilson",
                        "Head of Digital Transformation",
                        "sarah.wilson@example.com",
                        "sarahwilson",
                    ),
                ],
            ),
            company(
                "Melbourne Industrial Solutions",
                "Manufacturing",
                "www.melbourneindustrial.com.au",
                "200-500 employees",
                &[
                    ("Michael Chen", "CFO", "m.chen@example.com", "michaelchen"),
                    (
                        "Jessica Taylor",
                        "Digital Transformation Lead",
                        "j.taylor@example.com",
                        "jtaylor",
                    ),
                ],
            ),
            company(
                "BuildRight Constructions",
                "Construction",
                "www.buildright.com.au",
                "100-250 employees",
                &[
                    ("David Thompson", "CFO", "d.thompson@example.com", "davidthompson"),
                    (
                        "Jane Smith",
                        "Digital Transformation Lead",
                        "jane.smith@example.com",
                        "janesmith",
                    ),
                ],
            ),
            company(
                "Sydney Builders Group",
                "Construction",
                "www.sydneybuilders.com.au",
                "500-1000 employees",
                &[
                    ("Robert Johnson", "CFO", "r.johnson@example.com", "robertjohnson"),
                    (
                        "Emma Davis",
                        "Head of Digital Transformation",
                        "emma.davis@example.com",
                        "emmadavis",
                    ),
                ],
            ),
        ])
    }
}

fn company(
    name: &str,
    industry: &str,
    website: &str,
    size: &str,
    people: &[(&str, &str, &str, &str)],
) -> DirectoryCompany {
    DirectoryCompany {
        name: name.to_string(),
        industry: industry.to_string(),
        region: "Australia".to_string(),
        website: website.to_string(),
        size: size.to_string(),
        people: people
            .iter()
            .map(|(name, role, email, handle)| DirectoryPerson {
                name: name.to_string(),
                role: role.to_string(),
                email: email.to_string(),
                linkedin_url: format!("linkedin.com/in/{handle}"),
            })
            .collect(),
    }
}

impl LeadSource for MockDirectory {
    fn find_contacts(&self, query: &LeadQuery) -> Vec<Contact> {
        let mut seen = HashSet::new();
        let contacts: Vec<Contact> = self
            .companies
            .iter()
            .filter(|c| query.matches_industry(&c.industry) && query.matches_region(&c.region))
            .flat_map(|c| {
                c.people
                    .iter()
                    .filter(|p| query.matches_role(&p.role))
                    .map(move |p| {
                        Contact::new(&p.name, &p.role, &c.name, &p.email, &c.industry)
                            .with_company_size(&c.size)
                            .with_website(&c.website)
                            .with_linkedin(&p.linkedin_url)
                    })
            })
            .filter(|contact| seen.insert(contact.key()))
            .collect();

        info!(
            industries = %query.industry_filter,
            region = %query.region,
            roles = ?query.role_filter,
            found = contacts.len(),
            "Lead search complete"
        );
        contacts
    }
}
