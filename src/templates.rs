//! HTML templates for the admin panel, compiled into the binary.

use tera::Tera;

pub const ADMIN_TEMPLATE: &str = "admin.html";
pub const ADMIN_ERROR_TEMPLATE: &str = "admin_error.html";

pub fn load() -> tera::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (ADMIN_TEMPLATE, include_str!("../templates/admin.html")),
        (
            ADMIN_ERROR_TEMPLATE,
            include_str!("../templates/admin_error.html"),
        ),
    ])?;
    Ok(tera)
}
