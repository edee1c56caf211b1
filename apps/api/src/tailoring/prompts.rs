// Prompt constants for the tailoring stage.

/// Instruction placed ahead of the tailoring schema.
pub const TAILORING_INSTRUCTION: &str = "The input holds two parts: a JSON document \
    describing a candidate's work experience (activities, skills and measurable impact at \
    each job, each job identified by its role_id) and a job description. Given the \
    candidate's experience, construct a list of resume points for each job they have had \
    that is specifically tailored to this job description. Tag every resume point with the \
    role_id of the job it describes, using only role_id values present in the work history. \
    Order the points as they should appear on the resume. In addition, give a brief \
    assessment of whether or not the candidate is a good fit for the role. Extract the \
    hiring company and the job title from the job description; leave them empty if the \
    description does not state them.";

/// Label for the structured history input. Replace `{work_history}`.
pub const WORK_HISTORY_INPUT_TEMPLATE: &str = "CANDIDATE WORK HISTORY (JSON):\n{work_history}";

/// Label for the job description input. Replace `{job_description}`.
pub const JOB_DESCRIPTION_INPUT_TEMPLATE: &str = "JOB DESCRIPTION:\n{job_description}";
