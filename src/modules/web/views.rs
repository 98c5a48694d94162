//! Minimal HTML pages for the registration and confirmation forms.

use crate::modules::registration::{RegistrationForm, ValidationErrors};
use crate::modules::utils::io::escape_html;

/// What the confirmation page should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmView {
    Prompt { token: String, error: Option<String> },
    InvalidToken(String),
    Success(String),
}

fn layout(title: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         {content}\
         </body>\n\
         </html>\n",
        title = escape_html(title),
        content = content
    )
}

fn alert(class: &str, message: &str) -> String {
    format!(
        "<p class=\"alert alert-{}\">{}</p>\n",
        class,
        escape_html(message)
    )
}

fn field_error(errors: &ValidationErrors, field: &str) -> String {
    errors
        .for_field(field)
        .map(|message| format!("<span class=\"field-error\">{}</span>", escape_html(message)))
        .unwrap_or_default()
}

/// Registration form, optionally with the outcome of a previous submission
pub fn register_page(
    form: &RegistrationForm,
    confirmation: Option<&str>,
    error: Option<&str>,
    errors: &ValidationErrors,
) -> String {
    let mut content = String::new();

    if let Some(message) = confirmation {
        content.push_str(&alert("success", message));
    }
    if let Some(message) = error {
        content.push_str(&alert("danger", message));
    }

    content.push_str(&format!(
        "<form method=\"post\" action=\"/register\">\n\
         <label>First name <input type=\"text\" name=\"first_name\" value=\"{first}\"></label>{first_err}\n\
         <label>Last name <input type=\"text\" name=\"last_name\" value=\"{last}\"></label>{last_err}\n\
         <label>E-mail <input type=\"email\" name=\"email\" value=\"{email}\"></label>{email_err}\n\
         <label>Password <input type=\"password\" name=\"password\"></label>{password_err}\n\
         <button type=\"submit\">Register</button>\n\
         </form>\n",
        first = escape_html(&form.first_name),
        first_err = field_error(errors, "first_name"),
        last = escape_html(&form.last_name),
        last_err = field_error(errors, "last_name"),
        email = escape_html(&form.email),
        email_err = field_error(errors, "email"),
        password_err = field_error(errors, "password"),
    ));

    layout("Registration", &content)
}

/// Set-password page reached from the confirmation link
pub fn confirm_page(view: &ConfirmView) -> String {
    let content = match view {
        ConfirmView::InvalidToken(message) => alert("danger", message),
        ConfirmView::Success(message) => alert("success", message),
        ConfirmView::Prompt { token, error } => {
            let mut content = error
                .as_deref()
                .map(|message| alert("danger", message))
                .unwrap_or_default();

            content.push_str(&format!(
                "<form method=\"post\" action=\"/confirm\">\n\
                 <input type=\"hidden\" name=\"token\" value=\"{}\">\n\
                 <label>Password <input type=\"password\" name=\"password\"></label>\n\
                 <button type=\"submit\">Set password</button>\n\
                 </form>\n",
                escape_html(token)
            ));
            content
        }
    };

    layout("Set your password", &content)
}

pub fn error_page(message: &str) -> String {
    layout("Error", &alert("danger", message))
}
