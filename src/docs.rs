//! Markdown API documentation, written once at boot when configured.

use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

struct EndpointDoc {
    method: &'static str,
    path: &'static str,
    title: &'static str,
    summary: &'static str,
    inputs: &'static [&'static str],
    inputs_heading: &'static str,
    response: &'static str,
}

const ENDPOINTS: &[EndpointDoc] = &[
    EndpointDoc {
        method: "POST",
        path: "/login",
        title: "Login",
        summary: "Authenticate a user and return a bearer token.",
        inputs_heading: "Request Body (form)",
        inputs: &["username: string", "secret: string (`password` is accepted too)"],
        response: "{\n  \"token\": \"...\",\n  \"token_type\": \"bearer\",\n  \"expires_in\": {ttl}\n}",
    },
    EndpointDoc {
        method: "POST",
        path: "/logout",
        title: "Logout",
        summary: "Invalidate the presented token, logging the user out.",
        inputs_heading: "Headers",
        inputs: &["Authorization: Bearer <token>"],
        response: "{\n  \"message\": \"Successfully logged out.\"\n}",
    },
    EndpointDoc {
        method: "GET",
        path: "/me",
        title: "Get Current User",
        summary: "Return the user the presented token belongs to.",
        inputs_heading: "Headers",
        inputs: &["Authorization: Bearer <token>"],
        response: "{\n  \"username\": \"alice\"\n}",
    },
];

const FLOW: &[(&str, &str)] = &[
    (
        "Login",
        "The client posts username and secret to `/login` and receives a token on success.",
    ),
    (
        "Authenticated requests",
        "The client sends `Authorization: Bearer <token>` to protected endpoints (`/me`, `/logout`).",
    ),
    (
        "Logout",
        "`/logout` removes the token from the session table; it is rejected from then on.",
    ),
    (
        "Token validation",
        "Each protected endpoint looks the token up server-side. Unknown, revoked and expired tokens all get the same 401.",
    ),
];

/// Render the API document. `ttl_secs` fills the `/login` example and the
/// notes section.
pub fn render_api_doc(ttl_secs: u64) -> String {
    let mut out = String::from("# tokengate API Documentation\n\n## Endpoints\n\n");

    for (i, ep) in ENDPOINTS.iter().enumerate() {
        let _ = writeln!(out, "### {}. {}", i + 1, ep.title);
        let _ = writeln!(out, "`{} {}`\n", ep.method, ep.path);
        let _ = writeln!(out, "{}\n", ep.summary);
        let _ = writeln!(out, "**{}:**", ep.inputs_heading);
        for input in ep.inputs {
            let _ = writeln!(out, "- {}", input);
        }
        let _ = writeln!(out, "\n**Response:**");
        let response = ep.response.replace("{ttl}", &ttl_secs.to_string());
        let _ = writeln!(out, "```\n{}\n```\n", response);
        let _ = writeln!(
            out,
            "Failure: `401` with `WWW-Authenticate: Bearer`.\n"
        );
    }

    out.push_str("## Flow\n\n");
    for (i, (step, text)) in FLOW.iter().enumerate() {
        let _ = writeln!(out, "{}. **{}**: {}", i + 1, step, text);
    }

    let _ = write!(
        out,
        "\n> **Note:** sessions expire {} seconds after login and live in memory only; \
         restarting the server logs everyone out.\n",
        ttl_secs
    );
    out
}

/// Write the API document to `path`. Failures are logged, never fatal.
pub fn write_api_doc(path: &Path, ttl_secs: u64) -> bool {
    match std::fs::write(path, render_api_doc(ttl_secs)) {
        Ok(()) => {
            info!("  API documentation written to {}", path.display());
            true
        }
        Err(e) => {
            warn!("Failed to write API documentation to {}: {}", path.display(), e);
            false
        }
    }
}
