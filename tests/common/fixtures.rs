use form_filler::engine::config::EngineConfig;

use crate::common::mock_page::{ClickEffect, MockDocument, MockPage};

pub const APPLY_URL: &str = "https://jobs.example.com/apply";

/// Engine config with every settle delay removed.
pub fn fast_config() -> EngineConfig {
    EngineConfig::default().without_delays()
}

/// Single-page job application.
pub fn application_form() -> MockDocument {
    let mut doc = MockDocument::new(APPLY_URL);
    doc.text("h1", "Apply for Backend Engineer");
    doc.open("form", &[("id", "application")]);
    doc.required_field("Full Name", "full_name", "text");
    doc.required_field("Email", "email", "email");
    doc.field("Phone", "phone", "tel");
    doc.field("Years of Experience", "years", "number");
    doc.field("Password", "password", "password");
    doc.select("Country", "country", &["Canada", "United States", "Mexico"]);
    doc.textarea("Cover Letter", "cover_letter");
    doc.checkbox("Subscribe to newsletter", "newsletter");
    doc.radio("Remote", "work_mode", "remote");
    doc.radio("On-site", "work_mode", "onsite");
    doc.file_input("Upload Resume", "resume");
    doc.submit("Submit Application");
    doc.close();
    doc
}

pub fn application_page() -> MockPage {
    MockPage::single(application_form())
}

/// Three-step wizard followed by a confirmation page. Step 2 only has a
/// Next control when `step2_next` is set.
pub fn three_step_wizard(step2_next: bool) -> MockPage {
    let mut step1 = MockDocument::new("https://jobs.example.com/apply/1");
    step1.open("div", &[("class", "wizard-step active step-1"), ("data-step", "1")]);
    step1.text("h2", "Personal details");
    step1.field("First Name", "first_name", "text");
    step1.field("Last Name", "last_name", "text");
    step1.button("Next", ClickEffect::NextPage);
    step1.close();

    let mut step2 = MockDocument::new("https://jobs.example.com/apply/2");
    step2.open("div", &[("class", "wizard-step active step-2"), ("data-step", "2")]);
    step2.text("h2", "Contact information");
    step2.field("Email", "email", "email");
    step2.field("Phone", "phone", "tel");
    step2.button("Back", ClickEffect::GoTo(0));
    if step2_next {
        step2.button("Continue", ClickEffect::NextPage);
    }
    step2.close();

    let mut step3 = MockDocument::new("https://jobs.example.com/apply/3");
    step3.open("div", &[("class", "wizard-step active step-3"), ("data-step", "3")]);
    step3.text("h2", "Review");
    step3.checkbox("I agree to the terms", "terms");
    step3.submit("Submit");
    step3.close();

    let mut done = MockDocument::new("https://jobs.example.com/apply/done");
    done.text("h1", "Thank you! Your application was received.");

    MockPage::new(vec![step1, step2, step3, done])
}
