// src/answers/prompts.rs
//! Prompt templates. Placeholders are `{name}` and filled by [`render`].

use crate::types::Section;

/// Single pass over the template: substituted values are never scanned again.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let replacement = after.find('}').and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });

        match replacement {
            Some((value, end)) => {
                output.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                output.push('{');
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}

pub const SECTION_CLASSIFIER: &str = r#"You are assisting a bot that automatically applies for jobs. The bot receives questions from job application forms and must decide which section of the applicant's resume is most relevant to answer them.

For the following question: '{question}', determine which section of the resume is most relevant.
Respond with exactly one of the following options:
{sections}

Guidelines:
1. Personal information: contact details and online profiles (email, phone, LinkedIn, GitHub, website).
2. Self Identification: gender, pronouns, veteran status, disability status, ethnicity.
3. Legal Authorization: work authorization, visas, sponsorship, legal right to work.
4. Work Preferences: remote or in-person work, relocation, assessments, drug tests, background checks.
5. Education Details: degrees, universities, grades, fields of study.
6. Experience Details: job positions, companies, responsibilities, skills acquired.
7. Projects: specific projects, their descriptions and links.
8. Availability: notice period and start date.
9. Salary Expectations: desired salary or compensation.
10. Certifications: professional certifications and licenses.
11. Languages: spoken languages and proficiency.
12. Interests: hobbies and professional interests.
13. Cover letter: cover letters or personalised written statements.

Provide only the exact name of the section from the list above with no additional text."#;

const SECTION_ANSWER: &str = r#"You are answering a job application form on behalf of the applicant, in the first person.

Relevant part of the applicant's resume ({section}):
{resume_section}

{guidance}

Question: {question}

Answer concisely and truthfully using only the information above. If the information is missing, give the most reasonable short answer an applicant with this background would give. Do not add explanations."#;

pub const COVER_LETTER: &str = r#"Write the body of a cover letter for the job below, in the first person, based on the applicant's resume. Keep it to three short paragraphs, professional and specific to the role. Do not include a greeting, a sign-off, placeholders or the applicant's contact details.

Resume:
{resume}

Job description:
{job_description}"#;

pub const NUMERIC_QUESTION: &str = r#"You are answering a numeric question of a job application form on behalf of the applicant.

Education:
{resume_educations}

Work experience:
{resume_jobs}

Projects:
{resume_projects}

Question: {question}

Reply with a single integer only. When the question asks for years of experience with something the applicant has used without an explicit duration, estimate it from the periods above."#;

pub const OPTIONS_QUESTION: &str = r#"You are answering a multiple-choice question of a job application form on behalf of the applicant.

Resume:
{resume}

Question: {question}

Options:
{options}

Reply with exactly one of the options, copied verbatim, with no additional text."#;

/// Guidance specific to the section a question was routed to.
fn section_guidance(section: Section) -> &'static str {
    match section {
        Section::PersonalInformation => "Give contact details or profile links exactly as listed.",
        Section::SelfIdentification => "Answer self-identification questions exactly as stated; if a value is missing prefer 'Prefer not to say'.",
        Section::LegalAuthorization => "Answer authorization and sponsorship questions with a clear yes or no.",
        Section::WorkPreferences => "Answer preference questions with a clear yes or no where possible.",
        Section::EducationDetails => "Refer to the degree, institution and field of study.",
        Section::ExperienceDetails => "Refer to concrete positions, companies and responsibilities.",
        Section::Projects => "Refer to the most relevant project by name.",
        Section::Availability => "State the notice period or earliest start.",
        Section::SalaryExpectations => "State the expected salary range; a single number when a number is asked for.",
        Section::Certifications => "Name the relevant certifications.",
        Section::Languages => "Name the languages and proficiency levels.",
        Section::Interests => "Mention the relevant interests briefly.",
        Section::CoverLetter => "Write a short personalised statement.",
    }
}

pub fn section_classifier(question: &str) -> String {
    let sections = Section::ALL
        .iter()
        .map(|section| format!("- {}", section.label()))
        .collect::<Vec<_>>()
        .join("\n");
    render(SECTION_CLASSIFIER, &[("question", question), ("sections", &sections)])
}

pub fn section_answer(section: Section, resume_section: &str, question: &str) -> String {
    render(
        SECTION_ANSWER,
        &[
            ("section", section.label()),
            ("resume_section", resume_section),
            ("guidance", section_guidance(section)),
            ("question", question),
        ],
    )
}
