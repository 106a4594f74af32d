//! Prompt construction for the research and email stages.
//!
//! Research asks for one `Label: value` line per schema field so the parser
//! can match it; the email prompt requires `SUBJECT:` and `MESSAGE #1:`
//! markers and feeds back the non-empty research fields.

use std::fmt::Write;

use outreach_shared::{Prospect, ResearchField, ResearchRecord, SenderProfile};

/// A system/user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn research_prompt(prospect: &Prospect, sender: &SenderProfile) -> Prompt {
    let system = format!(
        "You are a B2B sales researcher working for {company}, {pitch}.\n\
         You research one prospect at a time and report buying signals relevant to {company}.\n\
         Use public information and careful inference from the person's role, \
         company and industry.\n\
         When a signal cannot be found, write NA for it. Never invent quotes or URLs.",
        company = sender.company,
        pitch = sender.value_proposition,
    );

    let mut user = String::new();
    let _ = writeln!(user, "Research this prospect:");
    let _ = writeln!(user, "- Name: {}", prospect.person_name);
    let _ = writeln!(user, "- Company: {}", prospect.company_name);
    if let Some(url) = &prospect.linkedin_url {
        let _ = writeln!(user, "- LinkedIn: {url}");
    }
    let _ = writeln!(
        user,
        "\nReply with exactly one line per signal below, in this order, formatted as \
         `Label: value`. Keep each value on a single line.\n"
    );
    for field in ResearchField::ALL {
        let spec = field.spec();
        let _ = writeln!(
            user,
            "{}: <{}; look at {}>",
            spec.label,
            spec.why_it_matters.to_lowercase(),
            spec.how_to_capture.to_lowercase()
        );
    }
    let _ = write!(
        user,
        "\nFor \"{}\", explain concretely how {} fits this prospect's needs.",
        ResearchField::HowWeCanHelp.label(),
        sender.company
    );

    Prompt { system, user }
}

pub fn email_prompt(
    prospect: &Prospect,
    research: &ResearchRecord,
    sender: &SenderProfile,
) -> Prompt {
    let customers = join_names(&sender.reference_customers);

    let system = format!(
        "You write short, personal LinkedIn DMs for {company}, {pitch}.\n\
         Every message must reference this prospect's specific work from the research provided. \
         Keep it under 120 words, warm and direct, with one clear ask for a short intro call.",
        company = sender.company,
        pitch = sender.value_proposition,
    );

    let mut user = String::new();
    let _ = writeln!(
        user,
        "Write one outreach message to {} at {}.\n",
        prospect.person_name, prospect.company_name
    );
    let _ = writeln!(user, "Research:");
    let mut any = false;
    for (field, value) in research.iter() {
        if value.trim().is_empty() {
            continue;
        }
        any = true;
        let _ = writeln!(user, "- {}: {}", field.label(), value.trim());
    }
    if !any {
        let _ = writeln!(user, "- (no research available; rely on role and company)");
    }

    let _ = writeln!(user, "\nOutput format, exactly:");
    let _ = writeln!(user, "SUBJECT: <subject line>");
    let _ = writeln!(user, "MESSAGE #1:");
    let _ = writeln!(
        user,
        "Hi {first}, I sincerely relate seeing {company}'s work on <their specific AI initiative>. \
         Are you working on <their specific project> and is scaling this or \
         <their specific challenge> a key interest?{proof} Can we have a short intro chat \
         (phone call/Zoom, your choice) and see if we really bring any value?",
        first = prospect.first_name(),
        company = prospect.company_name,
        proof = if customers.is_empty() {
            String::new()
        } else {
            format!(
                " {customers} are already in production with {} and seeing measurable GenAI ROI.",
                sender.company
            )
        },
    );

    Prompt { system, user }
}

/// `"A, B, and C"` style list.
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}
