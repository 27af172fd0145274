//! Built-in newsletter template bodies.
//!
//! These are deliberately plain email-client HTML: table layout, inline
//! styles, no external CSS. Every body is a MiniJinja template; callers can
//! override any of them through [`crate::config::TemplateSet`] without
//! touching the assembly logic.
//!
//! Variables each template receives:
//!
//! | Template        | Variables |
//! |-----------------|-----------|
//! | `start`         | `email_subject` (plain text), `header_image` (logo URL), `email_start` (HTML) |
//! | `content_block` | `header_image` (URL, may be empty), `styled_content` (HTML) |
//! | `social_block`  | `social_link`, `social_image` |
//! | `end`           | `email_end` (HTML) |
//!
//! The tail is static boilerplate, rendered verbatim after the social blocks.

/// Document head, preheader, logo, and opening copy.
pub const DEFAULT_START: &str = r#"<!doctype html>
<html xmlns="http://www.w3.org/1999/xhtml">
  <head>
    <meta charset="UTF-8">
    <meta http-equiv="X-UA-Compatible" content="IE=edge">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{{ email_subject }}</title>
  </head>
  <body style="margin: 0; padding: 0; background-color: #1A1A1A;">
    <center>
      <table border="0" cellpadding="0" cellspacing="0" width="600" style="border-collapse: collapse; background-color: #2B2B2B;">
        <tr>
          <td align="center" style="padding: 24px 18px 8px 18px;">
            <img align="center" alt="" src="{{ header_image }}" width="564" style="max-width: 1500px; display: inline !important; vertical-align: bottom; border: 0; height: auto; outline: none; text-decoration: none;">
          </td>
        </tr>
        <tr>
          <td style="padding: 8px 24px;" class="user-content">
            {{ email_start }}
          </td>
        </tr>
"#;

/// One section: its header image followed by its exported content.
pub const DEFAULT_CONTENT_BLOCK: &str = r#"        <tr>
          <td align="center" style="padding: 16px 18px 0 18px;">
            <img alt="" src="{{ header_image }}" width="552" style="max-width: 1500px; border: 0; height: auto; outline: none; text-decoration: none; vertical-align: bottom;">
          </td>
        </tr>
        <tr>
          <td style="padding: 8px 24px;" class="user-content">
            {{ styled_content }}
          </td>
        </tr>
"#;

/// One social icon linking out.
pub const DEFAULT_SOCIAL_BLOCK: &str = r#"              <td align="center" valign="top" style="padding: 0 10px;">
                <a href="{{ social_link }}" target="_blank"><img src="{{ social_image }}" alt="{{ social_link }}" width="48" style="width: 48px; max-width: 48px; display: block; border: 0; height: auto; outline: none; text-decoration: none;"></a>
              </td>
"#;

/// Closing copy before the social row.
pub const DEFAULT_END: &str = r#"        <tr>
          <td style="padding: 16px 24px;" class="user-content">
            {{ email_end }}
          </td>
        </tr>
        <tr>
          <td align="center" style="padding: 12px 18px;">
            <table border="0" cellpadding="0" cellspacing="0" style="border-collapse: collapse;">
              <tr>
"#;

/// Static boilerplate closing the social row and the document.
pub const DEFAULT_TAIL: &str = r#"              </tr>
            </table>
          </td>
        </tr>
      </table>
    </center>
  </body>
</html>
"#;

/// Inline style forced onto every exported paragraph. Email clients strip
/// `<style>` blocks, so the exporter's class-based styling has to be rewritten
/// to inline form before sending.
pub const PARAGRAPH_STYLE_PREFIX: &str = r#"<p dir="ltr" style="color: #F2F2F2;font-family: Helvetica;font-size: 14px;font-weight: bold;text-align: center;margin: 10px 0;padding: 0;mso-line-height-rule: exactly;-ms-text-size-adjust: 100%;-webkit-text-size-adjust: 100%;line-height: 150%;" class="#;
