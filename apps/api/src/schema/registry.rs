use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::error::EngineError;
use crate::schema::entity::{EntitySchema, SchemaError};
use crate::schema::field::FieldDef;

/// Immutable mapping from collection id to schema, built once at startup.
///
/// Adding a manageable entity type means adding one schema to
/// [`EntityRegistry::builtin`]; nothing else inspects collection ids.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    order: Vec<Arc<EntitySchema>>,
    by_id: HashMap<String, Arc<EntitySchema>>,
}

impl EntityRegistry {
    pub fn new(schemas: Vec<EntitySchema>) -> Result<Self, SchemaError> {
        let mut order = Vec::with_capacity(schemas.len());
        let mut by_id = HashMap::with_capacity(schemas.len());

        for schema in schemas {
            let schema = Arc::new(schema);
            if by_id
                .insert(schema.id().to_string(), Arc::clone(&schema))
                .is_some()
            {
                return Err(SchemaError::DuplicateCollection(schema.id().to_string()));
            }
            order.push(schema);
        }

        Ok(Self { order, by_id })
    }

    pub fn get(&self, collection_id: &str) -> Result<&Arc<EntitySchema>, EngineError> {
        self.by_id
            .get(collection_id)
            .ok_or_else(|| EngineError::CollectionNotFound(collection_id.to_string()))
    }

    /// Schemas in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntitySchema>> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// The dashboard's collections.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::new(vec![
            projects()?,
            resumes()?,
            cvs()?,
            placement_agencies()?,
            recruiters()?,
            certifications()?,
            skills()?,
            applications()?,
            blogs()?,
        ])
    }
}

fn projects() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "projects",
        "Projects",
        "Manage your portfolio projects.",
        vec![
            FieldDef::text("project_name", "Project Name")
                .required()
                .placeholder("e.g. EcoMind AI"),
            FieldDef::long_text("description", "Description")
                .required()
                .placeholder("Project details..."),
            FieldDef::select(
                "category",
                "Category",
                &["Gen AI", "DevOps", "Backend", "Testing", "Frontend"],
            )
            .required(),
            FieldDef::file("thumbnail", "Thumbnail Image", "image/*").required(),
            FieldDef::url("live_link", "Live URL").placeholder("https://..."),
            FieldDef::url("github_link", "GitHub URL").placeholder("https://github.com/..."),
            FieldDef::text("tech_stack", "Tech Stack")
                .placeholder("e.g. React, Python")
                .as_tags(),
        ],
    )
}

fn resumes() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "resumes",
        "Resumes",
        "Store versions of your general resume.",
        vec![
            FieldDef::text("title", "Title")
                .required()
                .placeholder("e.g. Senior Backend Resume"),
            FieldDef::select("category", "Category", &["Gen AI", "DevOps", "Backend", "Testing"])
                .required(),
            FieldDef::date("version_date", "Version Date").required(),
            FieldDef::file("file", "Resume File", ".pdf,.docx").required(),
        ],
    )
}

fn cvs() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "cvs",
        "Personalized CVs",
        "CVs tailored for specific companies.",
        vec![
            FieldDef::text("company_name", "Company Name")
                .required()
                .placeholder("e.g. Google"),
            FieldDef::text("role_applied_for", "Role")
                .required()
                .placeholder("e.g. AI Researcher"),
            FieldDef::file("file", "CV File", ".pdf,.docx").required(),
        ],
    )
}

fn placement_agencies() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "placement_agencies",
        "Placement Agencies",
        "Contacts for job hunting agencies.",
        vec![
            FieldDef::text("agency_name", "Agency Name").required(),
            FieldDef::text("contact_person", "Contact Person").placeholder("Name"),
            FieldDef::text("phone", "Phone"),
            FieldDef::email("email", "Email"),
            FieldDef::url("website", "Website"),
            FieldDef::text("notes", "Notes"),
        ],
    )
}

fn recruiters() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "recruiters",
        "Recruiters",
        "Direct recruiter contacts.",
        vec![
            FieldDef::text("recruiter_name", "Recruiter Name").required(),
            FieldDef::text("company", "Company").required(),
            FieldDef::url("linkedin_profile", "LinkedIn"),
            FieldDef::text("phone", "Phone"),
            FieldDef::email("email", "Email"),
            FieldDef::select(
                "status",
                "Status",
                &["New", "Connected", "Messaged", "Interviewing"],
            )
            .required(),
        ],
    )
}

fn certifications() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "certifications",
        "Certifications",
        "Your earned credentials.",
        vec![
            FieldDef::text("certificate_name", "Certificate Name").required(),
            FieldDef::text("provider", "Provider").placeholder("e.g. AWS"),
            FieldDef::select("domain", "Domain", &["Cloud", "AI", "Security", "Development"])
                .required(),
            FieldDef::date("completion_date", "Completion Date"),
            FieldDef::url("credential_url", "Credential URL"),
            FieldDef::file("certificate_file", "Certificate File", ".pdf,.png,.jpg").required(),
        ],
    )
}

fn skills() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "skills",
        "Skill Nexus",
        "Strategic learning roadmap.",
        vec![
            FieldDef::text("title", "Skill / Milestone")
                .required()
                .placeholder("e.g. Advanced TypeScript"),
            FieldDef::select("status", "Status", &["Backlog", "In Progress", "Completed"])
                .required(),
            FieldDef::date("target_date", "Target / Completion Date").required(),
            FieldDef::select(
                "category",
                "Category",
                &["Frontend", "Backend", "AI", "DevOps", "Design", "Other"],
            )
            .required(),
            FieldDef::long_text("description", "Deep Dive Notes")
                .placeholder("What did you learn? Resources?"),
            FieldDef::text("icon", "Icon (Emoji)").placeholder("e.g. 🚀"),
            FieldDef::json("resource_links", "Resource Links (JSON)"),
            FieldDef::file("attachments", "File Attachments", ".pdf,.png,.jpg,.docx")
                .allow_multiple(),
        ],
    )
}

const APPLICATION_STATUSES: &[&str] = &[
    "Not Applied",
    "Applied",
    "Screening",
    "Interview",
    "Offer",
    "Rejected",
    "Ghosted",
];

const APPLICATION_ROLES: &[&str] = &[
    "frontend",
    "backend",
    "fullstack",
    "ai_engineer",
    "data_scientist",
    "devops",
    "product_manager",
    "ui_ux_designer",
    "qa_engineer",
    "mobile_engineer",
    "cloud_architect",
    "technical_writer",
    "business_analyst",
    "solutions_architect",
];

fn applications() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "applications",
        "Applications",
        "Track every job application end to end.",
        vec![
            FieldDef::text("company", "Company")
                .required()
                .placeholder("e.g. Google"),
            FieldDef::select("role", "Role", APPLICATION_ROLES).required(),
            FieldDef::select("status", "Status", APPLICATION_STATUSES).required(),
            FieldDef::date("date_applied", "Date Applied"),
            FieldDef::text("salary", "Salary").placeholder("e.g. 30 LPA"),
            FieldDef::text("location", "Location").placeholder("e.g. Remote"),
            FieldDef::url("url", "Job Posting URL").placeholder("https://..."),
            FieldDef::long_text("notes", "Notes"),
        ],
    )
}

fn blogs() -> Result<EntitySchema, SchemaError> {
    EntitySchema::new(
        "blogs",
        "Blogs",
        "Write and publish articles.",
        vec![
            FieldDef::text("title", "Title")
                .required()
                .placeholder("Article Headline"),
            FieldDef::text("slug", "Slug")
                .required()
                .placeholder("article-slug"),
            FieldDef::select(
                "category",
                "Category",
                &["GenAI", "Engineering", "Tutorial", "Career"],
            ),
            FieldDef::date("published_date", "Published Date"),
            FieldDef::long_text("excerpt", "Excerpt").placeholder("Brief summary..."),
            FieldDef::long_text("content", "Content").placeholder("# Write your masterpiece..."),
            FieldDef::file("thumbnail", "Thumbnail", "image/*"),
        ],
    )
}
