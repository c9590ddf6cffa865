//! # Server-rendered Pages
//!
//! Plain HTML strings. Every page goes through [`layout`], which puts the
//! theme on the `<html>` element. Anything user-supplied goes through
//! [`escape`].

use crate::auth::password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use crate::db::models::{Session, User};
use crate::flags::FeatureFlags;
use crate::theme::Theme;
use std::fmt::Write;

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn layout(title: &str, theme: Theme, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="{theme}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · Launchpad</title>
</head>
<body>
<header>
<nav><a href="/">Launchpad</a> <a href="/dashboard">Dashboard</a></nav>
<form method="post" action="/theme"><button type="submit">Switch to {other} theme</button></form>
</header>
<main>
{body}
</main>
</body>
</html>"#,
        theme = theme,
        other = theme.toggle(),
        title = escape(title),
        body = body,
    )
}

fn alert(error: Option<&str>, notice: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(error) = error {
        let _ = write!(out, r#"<p role="alert" class="error">{}</p>"#, escape(error));
    }
    if let Some(notice) = notice {
        let _ = write!(out, r#"<p role="status" class="notice">{}</p>"#, escape(notice));
    }
    out
}

pub fn landing(theme: Theme, user: Option<&User>) -> String {
    let call_to_action = match user {
        Some(user) => format!(
            r#"<p>Welcome back, {}.</p><p><a href="/dashboard">Go to your dashboard</a></p>"#,
            escape(&user.name)
        ),
        None => r#"<p><a href="/auth/signin">Sign in</a> or <a href="/auth/signup">create an account</a>.</p>"#
            .to_string(),
    };

    layout(
        "Welcome",
        theme,
        &format!(
            "<h1>Launchpad</h1><p>A starting point for web applications with accounts, sessions and feature flags.</p>{}",
            call_to_action
        ),
    )
}

pub fn sign_in(theme: Theme, email: &str, error: Option<&str>, notice: Option<&str>) -> String {
    layout(
        "Sign in",
        theme,
        &format!(
            r#"<h1>Sign in</h1>
{alert}
<form method="post" action="/auth/signin">
<label for="email">Email</label>
<input id="email" name="email" type="email" value="{email}" required>
<label for="password">Password</label>
<input id="password" name="password" type="password" required>
<button type="submit">Sign in</button>
</form>
<p><a href="/auth/forgot-password">Forgot your password?</a></p>
<p>No account yet? <a href="/auth/signup">Sign up</a></p>"#,
            alert = alert(error, notice),
            email = escape(email),
        ),
    )
}

pub fn sign_up(theme: Theme, name: &str, email: &str, error: Option<&str>, enabled: bool) -> String {
    if !enabled {
        return layout(
            "Sign up",
            theme,
            r#"<h1>Sign up</h1><p>New registrations are closed at the moment.</p><p><a href="/auth/signin">Sign in</a></p>"#,
        );
    }

    layout(
        "Sign up",
        theme,
        &format!(
            r#"<h1>Create an account</h1>
{alert}
<form method="post" action="/auth/signup">
<label for="name">Name</label>
<input id="name" name="name" value="{name}" required>
<label for="email">Email</label>
<input id="email" name="email" type="email" value="{email}" required>
<label for="password">Password</label>
<input id="password" name="password" type="password" minlength="{min}" maxlength="{max}" required>
<button type="submit">Create account</button>
</form>
<p>Already have an account? <a href="/auth/signin">Sign in</a></p>"#,
            alert = alert(error, None),
            name = escape(name),
            email = escape(email),
            min = MIN_PASSWORD_LENGTH,
            max = MAX_PASSWORD_LENGTH,
        ),
    )
}

pub fn forgot_password(theme: Theme, error: Option<&str>, notice: Option<&str>) -> String {
    layout(
        "Forgot password",
        theme,
        &format!(
            r#"<h1>Reset your password</h1>
{alert}
<form method="post" action="/auth/forgot-password">
<label for="email">Email</label>
<input id="email" name="email" type="email" required>
<button type="submit">Send reset link</button>
</form>
<p><a href="/auth/signin">Back to sign in</a></p>"#,
            alert = alert(error, notice),
        ),
    )
}

pub fn reset_password(theme: Theme, token: Option<&str>, error: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return layout(
            "Reset password",
            theme,
            r#"<h1>Reset password</h1><p role="alert" class="error">This reset link is missing its token.</p><p><a href="/auth/forgot-password">Request a new link</a></p>"#,
        );
    };

    layout(
        "Reset password",
        theme,
        &format!(
            r#"<h1>Choose a new password</h1>
{alert}
<form method="post" action="/auth/reset-password">
<input type="hidden" name="token" value="{token}">
<label for="newPassword">New password</label>
<input id="newPassword" name="newPassword" type="password" minlength="{min}" maxlength="{max}" required>
<button type="submit">Reset password</button>
</form>"#,
            alert = alert(error, None),
            token = escape(token),
            min = MIN_PASSWORD_LENGTH,
            max = MAX_PASSWORD_LENGTH,
        ),
    )
}

pub fn verify_email(theme: Theme, outcome: Result<&User, &str>) -> String {
    let body = match outcome {
        Ok(user) => format!(
            r#"<h1>Email verified</h1><p>Thanks, {}. Your email address is confirmed.</p><p><a href="/auth/signin">Sign in</a></p>"#,
            escape(&user.email)
        ),
        Err(error) => format!(
            r#"<h1>Verification failed</h1>{}<p><a href="/auth/signin">Back to sign in</a></p>"#,
            alert(Some(error), None)
        ),
    };
    layout("Verify email", theme, &body)
}

pub fn dashboard(
    theme: Theme,
    user: &User,
    sessions: Option<&[Session]>,
    current_token: &str,
    flags: &FeatureFlags,
    error: Option<&str>,
    notice: Option<&str>,
) -> String {
    let mut body = format!(
        r#"<h1>Dashboard</h1>
{alert}
<section>
<h2>Profile</h2>
<p>{email} ({verified})</p>
<form method="post" action="/dashboard/profile">
<label for="name">Name</label>
<input id="name" name="name" value="{name}" maxlength="100" required>
<button type="submit">Save</button>
</form>
</section>"#,
        alert = alert(error, notice),
        email = escape(&user.email),
        verified = if user.email_verified { "verified" } else { "not verified" },
        name = escape(&user.name),
    );

    if let Some(sessions) = sessions {
        body.push_str("<section><h2>Active sessions</h2><ul>");
        for session in sessions {
            let _ = write!(
                body,
                "<li>{agent} from {ip}, expires {expires}{current}</li>",
                agent = escape(session.user_agent.as_deref().unwrap_or("Unknown browser")),
                ip = escape(session.ip_address.as_deref().unwrap_or("unknown address")),
                expires = session.expires_at.format("%Y-%m-%d %H:%M UTC"),
                current = if session.token == current_token { " (this browser)" } else { "" },
            );
        }
        body.push_str(
            r#"</ul><form method="post" action="/dashboard/sessions/revoke-others"><button type="submit">Sign out other browsers</button></form></section>"#,
        );
    }

    body.push_str("<section><h2>Feature flags</h2><ul>");
    for (name, enabled) in flags.iter() {
        let _ = write!(
            body,
            "<li><code>{}</code>: {}</li>",
            escape(name),
            if enabled { "on" } else { "off" }
        );
    }
    body.push_str("</ul></section>");
    body.push_str(
        r#"<form method="post" action="/dashboard/sign-out"><button type="submit">Sign out</button></form>"#,
    );

    layout("Dashboard", theme, &body)
}

pub fn not_found(theme: Theme) -> String {
    layout(
        "Not found",
        theme,
        r#"<h1>Page not found</h1><p><a href="/">Go home</a></p>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#x27;y&#x27;"
        );
    }

    #[test]
    fn test_layout_carries_theme() {
        let html = layout("Title", Theme::Dark, "<p>body</p>");
        assert!(html.contains(r#"<html lang="en" class="dark">"#));
        assert!(html.contains("Switch to light theme"));
    }

    #[test]
    fn test_user_content_is_escaped() {
        let mut user = User::new("<b>Mallory</b>".into(), "m@example.com".into());
        user.email_verified = true;
        let html = dashboard(
            Theme::Light,
            &user,
            None,
            "",
            &FeatureFlags::default(),
            None,
            None,
        );
        assert!(html.contains("&lt;b&gt;Mallory&lt;/b&gt;"));
        assert!(!html.contains("<b>Mallory</b>"));
        assert!(html.contains("(verified)"));
        assert!(!html.contains("Active sessions"));
    }

    #[test]
    fn test_reset_page_without_token() {
        let html = reset_password(Theme::Light, None, None);
        assert!(html.contains("missing its token"));
        assert!(!html.contains("newPassword"));
    }
}
