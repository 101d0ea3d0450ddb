/// Login surface rendering
use crate::auth::providers::Method;
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Which login form a page posts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Login,
    Ldap,
}

/// Everything the login page shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPage {
    pub title: String,
    pub base_path: String,
    pub surface: Surface,
    pub methods: Vec<Method>,
    pub last_used: Option<Method>,
    pub errors: Vec<String>,
}

impl LoginPage {
    fn form(&self, action: &str, heading: &str, last_used: bool) -> String {
        format!(
            r#"<form method="post" action="{}" class="login-form{}">
                <h2>{}</h2>
                <label>Username <input type="text" name="username" autocomplete="username" required></label>
                <label>Password <input type="password" name="password" autocomplete="current-password" required></label>
                <button type="submit">Sign in</button>
            </form>"#,
            encode_double_quoted_attribute(action),
            if last_used { " last-used" } else { "" },
            heading,
        )
    }

    fn federated_link(&self, method: Method) -> String {
        let (route, label) = match method {
            Method::Google => ("/auth/google", "Sign in with Google"),
            Method::Github => ("/auth/github", "Sign in with GitHub"),
            Method::Ldap => ("/ldap/login", "Sign in with your directory account"),
            Method::Alone | Method::Local => ("/login", "Sign in"),
        };

        format!(
            r#"<a href="{}{}" class="btn provider-btn provider-{}{}">{}</a>"#,
            encode_double_quoted_attribute(&self.base_path),
            route,
            method,
            if self.last_used == Some(method) {
                " last-used"
            } else {
                ""
            },
            label
        )
    }

    pub fn render(&self) -> String {
        let errors = self
            .errors
            .iter()
            .map(|e| format!(r#"<p class="alert">{}</p>"#, encode_text(e)))
            .collect::<Vec<_>>()
            .join("\n");

        let body = match self.surface {
            Surface::Ldap => self.form(
                &format!("{}/ldap/login", self.base_path),
                "Directory account",
                self.last_used == Some(Method::Ldap),
            ),
            Surface::Login => {
                let mut parts = Vec::new();
                if self.methods.iter().any(|m| m.uses_login_form()) {
                    parts.push(self.form(
                        &format!("{}/login", self.base_path),
                        "Account",
                        self.last_used.is_some_and(|m| m.uses_login_form()),
                    ));
                }
                parts.extend(
                    self.methods
                        .iter()
                        .filter(|m| !m.uses_login_form())
                        .map(|m| self.federated_link(*m)),
                );
                if parts.is_empty() {
                    parts.push("<p>No authentication method is enabled.</p>".to_string());
                }
                parts.join("\n")
            }
        };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Login</title>
</head>
<body>
    <main class="login">
        <h1>{title}</h1>
        {errors}
        {body}
    </main>
</body>
</html>"#,
            title = encode_text(&self.title),
            errors = errors,
            body = body,
        )
    }
}
