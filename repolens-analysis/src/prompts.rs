//! Prompt templates for every generation call the pipeline makes.
//!
//! Prompt construction is deterministic string templating. The JSON field
//! names requested here (`project_summary`, `identified_perspectives`,
//! `perspective_name`, ...) are a contract with [`crate::detect`] and must
//! not drift.

use crate::detect::Perspective;
use crate::snapshot::FileRecord;

/// Character cap for the README excerpt in the detection prompt.
const README_EXCERPT_CHARS: usize = 2000;
/// Character cap for each config file excerpt in the detection prompt.
const CONFIG_EXCERPT_CHARS: usize = 1000;
/// Character cap for each code file excerpt in perspective prompts.
const FILE_EXCERPT_CHARS: usize = 2000;

/// Closed set of perspective template families.
///
/// Template choice is a pure function of the detected perspective name;
/// this enum is the single place that string match lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerspectiveKind {
    Frontend,
    Backend,
    Generic,
}

/// Classify a detected perspective name into its template family.
pub fn classify(name: &str) -> PerspectiveKind {
    if name.contains("Frontend") {
        PerspectiveKind::Frontend
    } else if name.contains("Backend") {
        PerspectiveKind::Backend
    } else {
        PerspectiveKind::Generic
    }
}

/// First `max_chars` characters, with a marker when the text was cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}... (truncated)")
}

/// Render gathered files as fenced blocks for inclusion in a prompt.
fn render_files(files: &[FileRecord]) -> String {
    files
        .iter()
        .map(|f| {
            format!(
                "### {}\n```\n{}\n```",
                f.path,
                excerpt(&f.content, FILE_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Perspective detection ──────────────────────────────────────────────

/// Build the perspective-detection prompt from repository metadata.
/// Missing inputs are simply omitted.
pub fn detection_prompt(
    readme: Option<&str>,
    config_files: &[FileRecord],
    tree: &str,
) -> String {
    let readme_block = readme
        .map(|r| excerpt(r, README_EXCERPT_CHARS))
        .unwrap_or_default();
    let config_block = config_files
        .iter()
        .map(|f| format!("{}:\n{}", f.path, excerpt(&f.content, CONFIG_EXCERPT_CHARS)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a senior software architect. Your task is to analyze a codebase and produce a structured JSON summary of its major functional perspectives (layers/modules).

**Instructions:**
1. Carefully read the provided README, configuration files, and the top-level directory structure.
2. Identify the main "perspectives" or "functional layers" in the codebase. Examples: "Frontend UI Layer", "Backend API Layer", "Business Logic/Service Layer", "Data Access/ORM Layer", "Authentication Module", etc.
3. For each perspective, provide:
    - A clear, human-readable name (e.g., "Frontend UI Layer").
    - A concise description of its purpose and technology (e.g., "React-based user interface").
    - The key directories where its code lives.
    - The main entry-point files for this perspective.

**Output Format:**
Return a single JSON object with the following structure:

{{
  "project_summary": "A 1-2 sentence summary of the overall project purpose and tech stack.",
  "detected_tech_stack": ["List", "of", "major", "technologies"],
  "identified_perspectives": [
    {{
      "perspective_name": "Frontend UI Layer",
      "details": "React-based user interface",
      "key_directories": ["client/src/components", "client/src/pages"],
      "entry_points_or_main_files": ["client/src/App.js", "client/src/index.js"]
    }}
  ]
}}

**Input Provided:**
- README.md content:
{readme_block}

- Key config files:
{config_block}

- Top-level directory structure:
{tree}

**Output:**
Return ONLY the JSON object, nothing else.
"#
    )
}

// ── Per-perspective analysis ───────────────────────────────────────────

/// Build the analysis prompt for one perspective, dispatching on its
/// template family.
pub fn perspective_prompt(
    kind: PerspectiveKind,
    project_summary: &str,
    perspective: &Perspective,
    files: &[FileRecord],
) -> String {
    let files_block = render_files(files);
    match kind {
        PerspectiveKind::Frontend => {
            frontend_prompt(project_summary, perspective, &files_block)
        }
        PerspectiveKind::Backend => backend_prompt(project_summary, perspective, &files_block),
        PerspectiveKind::Generic => generic_prompt(project_summary, perspective, &files_block),
    }
}

fn frontend_prompt(project_summary: &str, perspective: &Perspective, files_block: &str) -> String {
    format!(
        r#"You are a Senior Frontend Architect. Analyze the provided Frontend UI Layer code files for a {details} application. The overall project context is: {project_summary}

The relevant files are:
{files_block}

Provide a detailed breakdown structured as follows using Markdown:

### Frontend UI Layer Analysis: {name}

#### 1. Core UI Components & Purpose:
For each major UI component file provided:
- **File:** `[filename]`
  - **Purpose/Responsibility:** (e.g., 'Renders the primary user login form')
  - **Key UI Elements Defined:** (e.g., 'Login button', 'Username input field')
  - **State Management (Local):** (How it manages its own state, if applicable)
  - **Props Received:** (Key props it expects and their purpose)

#### 2. API Endpoints Consumed & Data Flow:
- **Data Fetching Overview:** (How does this UI layer generally fetch data?)
- **Key API Interactions:**
  - **Feature/Component:** `[e.g., UserProfilePage]`
    - **Consumes API Endpoint:** `[e.g., GET /api/users/:id]`
    - **Purpose:** 'To fetch detailed user data for display.'
    - **Data Flow:** 'On page load, calls `fetchUserData(userId)`. Response data is stored in component state.'

#### 3. Navigation & Routing Structure:
- **Router Configuration File(s):** `[e.g., App.js, routes.js]`
- **Main Routes:**
  - **Path:** `[e.g., /profile/:userId]`
  - **Renders Component:** `[e.g., UserProfilePage]`
  - **Purpose:** 'Displays the profile for a specific user.'

#### 4. Global State Management (if detected):
- **Technology:** `[e.g., Redux, Zustand, Vuex, Context API]`
- **Key Store Modules/Slices:** `[e.g., authStore, userProfileStore]`
- **How UI Components Interact with Global State:** (e.g., 'UserProfilePage subscribes to `userProfileStore`')

#### 5. Noteworthy UI Logic or Patterns:
(e.g., 'Uses a custom hook `useAuth` for authentication checks', 'Implements lazy loading for images')

**You must return ONLY the Markdown output in the above structure.**
"#,
        details = perspective.details,
        name = perspective.name,
    )
}

fn backend_prompt(project_summary: &str, perspective: &Perspective, files_block: &str) -> String {
    format!(
        r#"You are a Senior Backend Architect. Analyze the provided Backend API Layer code files for a {details} application. The overall project context is: {project_summary}

The relevant files are:
{files_block}

Provide a detailed breakdown structured as follows using Markdown:

### Backend API Layer Analysis: {name}

#### 1. API Endpoint Inventory & Specifications:
For each major API endpoint defined:
- **Endpoint Path & Method(s):** `[e.g., GET, POST /api/items/:id]`
  - **Controller/View Function:** `[e.g., ItemViewSet.retrieve, ItemViewSet.create]`
  - **Purpose:** (e.g., 'Retrieves a specific item by ID')
  - **Request Body (for POST/PUT/PATCH):** (Expected JSON structure)
  - **Response Body (Success):** (Typical JSON structure)
  - **Authentication/Authorization:** (e.g., 'Requires JWT authentication')

#### 2. Core Logic Flow for Key Endpoints:
Select 2-3 critical endpoints:
- **Endpoint:** `[e.g., POST /api/orders]`
  - **Step 1 (Validation):** (e.g., 'Validates request body using OrderSerializer')
  - **Step 2 (Business Logic):** (e.g., 'Calls OrderService.createOrder')
  - **Step 3 (Data Persistence):** (e.g., 'Saves to database via OrderRepository')
  - **Step 4 (Response):** (e.g., 'Returns 201 Created with order data')
  - **Error Handling:** (How errors are caught and returned)

#### 3. Interaction with Other Layers/Services:
(e.g., 'ItemViewSet calls InventoryService', 'Auth logic delegated to AuthModule')

#### 4. Database Interaction:
- **Key Models/Entities:** `[e.g., Item, Order, User]`
- **ORM Usage:** (How the API layer uses the ORM)

#### 5. Noteworthy Design Patterns:
(e.g., 'Uses dependency injection', 'Implements caching for GET endpoints')

**You must return ONLY the Markdown output in the above structure.**
"#,
        details = perspective.details,
        name = perspective.name,
    )
}

fn generic_prompt(project_summary: &str, perspective: &Perspective, files_block: &str) -> String {
    format!(
        r#"You are a Senior Software Architect. Analyze the provided {name} code files. The overall project context is: {project_summary}

The relevant files are:
{files_block}

Provide a detailed breakdown structured as follows using Markdown:

### {name} Analysis

#### 1. Core Components & Purpose:
For each major component:
- **Component:** `[name]`
  - **Purpose:** (What does this component do?)
  - **Key Features:** (What are its main features?)
  - **Dependencies:** (What does it depend on?)

#### 2. Data Flow & Interactions:
- **Input Sources:** (Where does it get data from?)
- **Output Destinations:** (Where does it send data to?)
- **Key Interactions:** (How does it interact with other components?)

#### 3. Configuration & Setup:
- **Configuration Files:** (What config files are used?)
- **Environment Variables:** (What environment variables are needed?)
- **Dependencies:** (What external dependencies are required?)

#### 4. Notable Patterns & Practices:
(What design patterns or best practices are used?)

#### 5. Potential Improvements:
(What could be improved or optimized?)

**You must return ONLY the Markdown output in the above structure.**
"#,
        name = perspective.name,
    )
}

// ── Project overview & role summaries ──────────────────────────────────

/// Build the whole-project overview prompt for the multi-role report.
pub fn overview_prompt(tree: &str, config_files_json: &str) -> String {
    format!(
        r#"Analyze this codebase structure and configuration files to provide a comprehensive overview:

Directory Structure:
{tree}

Configuration Files:
{config_files_json}

Please provide a detailed analysis in the following JSON format:
{{
    "primary_languages": ["List of main programming languages used"],
    "frameworks": ["List of detected frameworks"],
    "project_type": "Type of project (e.g., web app, mobile app, library)",
    "key_directories": [
        {{
            "path": "directory path",
            "type": "frontend/backend/database/etc",
            "description": "purpose of this directory"
        }}
    ],
    "build_tools": ["List of detected build tools"],
    "deployment_info": {{
        "type": "How the project is deployed",
        "containerization": "Container setup if any",
        "environment": "Environment configuration"
    }},
    "project_summary": "Brief description of the project's purpose"
}}

Focus on providing accurate, well-reasoned insights based on the available information."#
    )
}

/// Build a role-specific summary prompt. `files_json` is the serialized
/// config/code file map; the product role works from the overview alone.
pub fn role_summary_prompt(
    role: crate::overview::SummaryRole,
    overview_json: &str,
    files_json: &str,
) -> String {
    use crate::overview::SummaryRole;
    match role {
        SummaryRole::Frontend => format!(
            r#"You are an expert Frontend Developer analyzing a codebase. Based on the project overview and the following frontend files:

Project Overview:
{overview_json}

Frontend Files:
{files_json}

Please provide a detailed analysis in the following JSON format:
{{
    "key_ui_components": [
        {{
            "name": "Component name",
            "responsibility": "Main purpose",
            "user_interactions": "How users interact with it",
            "location": "File path"
        }}
    ],
    "consumed_api_endpoints": [
        {{
            "path": "API endpoint path",
            "purpose": "What it's used for",
            "data_handling": "How the data is used",
            "location": "File path"
        }}
    ],
    "data_flow_example": "Description of a key feature's data flow",
    "state_management": {{
        "pattern": "State management approach used",
        "key_stores": "Main state stores/contexts",
        "data_flow": "How data flows through the state",
        "location": "File path"
    }},
    "navigation": {{
        "main_routes": "Key navigation paths",
        "routing_pattern": "How routing is implemented",
        "location": "File path"
    }},
    "styling": {{
        "approach": "CSS/styling approach used",
        "frameworks": "CSS frameworks or libraries",
        "theming": "Theme implementation if any",
        "location": "File path"
    }},
    "build_tools": {{
        "bundler": "Bundler used (webpack, vite, etc.)",
        "configuration": "Key build configurations",
        "location": "File path"
    }}
}}"#
        ),
        SummaryRole::Backend => format!(
            r#"You are an expert Backend Developer analyzing a codebase. Based on the project overview and the following backend files:

Project Overview:
{overview_json}

Backend Files:
{files_json}

Please provide a detailed analysis in the following JSON format:
{{
    "core_logic": {{
        "main_functionality": "Core business logic",
        "key_services": "Main service components",
        "business_rules": "Important business rules",
        "location": "File path"
    }},
    "api_endpoints": [
        {{
            "path": "Endpoint path",
            "method": "HTTP method",
            "purpose": "What it does",
            "request_format": "Expected request format",
            "response_format": "Response format",
            "location": "File path"
        }}
    ],
    "database": {{
        "interaction_pattern": "How the backend interacts with the database",
        "key_models": "Important data models",
        "query_patterns": "Common database operations",
        "location": "File path"
    }},
    "authentication": {{
        "mechanism": "Auth approach used",
        "key_components": "Main auth components",
        "security_measures": "Security features",
        "location": "File path"
    }},
    "data_processing": {{
        "transformations": "Data processing steps",
        "validation": "Data validation approach",
        "error_handling": "Error handling strategy",
        "location": "File path"
    }},
    "deployment": {{
        "environment": "Deployment environment",
        "configuration": "Deployment configuration",
        "scaling": "Scaling approach if any",
        "location": "File path"
    }}
}}"#
        ),
        SummaryRole::Data => format!(
            r#"You are an expert Data Engineer analyzing a codebase. Based on the project overview and the following data-related files:

Project Overview:
{overview_json}

Data Files:
{files_json}

Please provide a detailed analysis in the following JSON format:
{{
    "data_models": [
        {{
            "name": "Model name",
            "purpose": "What it represents",
            "key_fields": "Important fields",
            "relationships": "Relationships with other models",
            "location": "File path"
        }}
    ],
    "database": {{
        "type": "Database technology",
        "schema_pattern": "Schema organization",
        "migration_strategy": "How schema changes are managed",
        "location": "File path"
    }},
    "data_operations": {{
        "common_queries": "Frequent database operations",
        "data_transformations": "ETL or data processing",
        "optimization": "Performance considerations",
        "location": "File path"
    }},
    "data_quality": {{
        "validation": "Data validation approach",
        "constraints": "Data constraints",
        "integrity": "Data integrity measures",
        "location": "File path"
    }},
    "data_flow": {{
        "sources": "Data sources",
        "transformations": "Data transformation steps",
        "destinations": "Data destinations",
        "location": "File path"
    }}
}}"#
        ),
        SummaryRole::Product => format!(
            r#"You are a Product Manager analyzing a codebase. Based on the project overview and the following information:

Project Overview:
{overview_json}

Please provide a detailed analysis in the following JSON format:
{{
    "key_features": [
        {{
            "name": "Feature name",
            "purpose": "What it does",
            "user_value": "Value to users",
            "implementation": "How it's implemented"
        }}
    ],
    "problem_solved": "Main problem the application solves",
    "value_proposition": "Core value offered to users",
    "target_audience": {{
        "primary": "Main user group",
        "secondary": "Other user groups",
        "needs": "User needs addressed"
    }},
    "user_journey": {{
        "key_paths": "Main user flows",
        "interaction_points": "Key user interactions",
        "value_delivery": "How value is delivered"
    }},
    "technical_constraints": {{
        "limitations": "Technical limitations",
        "dependencies": "Key technical dependencies",
        "scalability": "Scalability considerations"
    }},
    "future_considerations": {{
        "improvements": "Potential improvements",
        "risks": "Technical risks",
        "opportunities": "Growth opportunities"
    }}
}}"#
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_a_substring_match() {
        assert_eq!(classify("Frontend UI Layer"), PerspectiveKind::Frontend);
        assert_eq!(classify("Backend API Layer"), PerspectiveKind::Backend);
        assert_eq!(classify("Data Access Layer"), PerspectiveKind::Generic);
        assert_eq!(classify("Authentication Module"), PerspectiveKind::Generic);
    }

    #[test]
    fn excerpt_caps_and_marks() {
        assert_eq!(excerpt("short", 10), "short");
        let cut = excerpt(&"x".repeat(20), 5);
        assert_eq!(cut, "xxxxx... (truncated)");
    }

    #[test]
    fn detection_prompt_embeds_all_sections() {
        let configs = vec![crate::snapshot::FileRecord {
            path: "package.json".into(),
            content: "{\"name\": \"demo\"}".into(),
            kind: crate::snapshot::FileKind::Config,
        }];
        let prompt = detection_prompt(Some("# Demo"), &configs, "src/\nREADME.md");
        assert!(prompt.contains("# Demo"));
        assert!(prompt.contains("package.json:"));
        assert!(prompt.contains("src/"));
        assert!(prompt.contains("identified_perspectives"));
    }

    #[test]
    fn detection_prompt_omits_missing_readme() {
        let prompt = detection_prompt(None, &[], "src/");
        assert!(prompt.contains("- README.md content:\n\n"));
    }
}
