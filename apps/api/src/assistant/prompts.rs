// All LLM prompt constants for the assistant module.
// Body templates use `{placeholder}` markers replaced before sending.

/// General document analysis. The result is persisted next to the document.
pub const DOCUMENT_ANALYSIS_SYSTEM: &str = "You are an AI assistant. Analyze the following resume. \
    Extract the candidate's name, contact info, skills, education, and work experience. \
    Provide a brief summary highlighting strengths and weaknesses, and suggest improvements. \
    Keep the analysis concise and easy to read.";

/// Recruiter-style resume review. Returned to the caller only.
pub const RESUME_REVIEW_SYSTEM: &str = "You are an expert HR recruiter. Analyze the following resume. \
    Provide strengths, weaknesses, suggested improvements, \
    and possible job roles that fit this candidate.";

pub const JOB_DESCRIPTION_SYSTEM: &str = "You are an expert HR content creator. \
    Create a professional job description for the following role. \
    Include responsibilities, required skills, and experience. \
    Format it clearly and concisely.";

/// Replace `{role}`, `{skills}` and `{experience}` before sending.
pub const JOB_DESCRIPTION_TEMPLATE: &str = "Create a professional job description for the role: {role}.
Required skills: {skills}.
Required experience: {experience}.";

pub const RESUME_WRITER_SYSTEM: &str = "You are an expert HR recruiter and resume writer. \
    Create a professional, ATS-friendly resume from the following information: \
    Include sections for contact info, education, experience, skills, and achievements. \
    Format it clearly and concisely.";

/// Replace `{name}`, `{contact}`, `{education}`, `{experience}` and `{skills}` before sending.
pub const RESUME_TEMPLATE: &str = "Create a professional resume for:
Name: {name}
Contact: {contact}
Education: {education}
Experience: {experience}
Skills: {skills}
Format it in a clean ATS-friendly style.";
