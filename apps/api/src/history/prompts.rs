// Instructions for role normalization.

pub const ROLE_EXTRACTION_INSTRUCTION: &str = "Given the following description of what \
    an employee did in a role, extract the activities performed, skills developed, and \
    measurable impact the employee had. If any of those pieces of information is not \
    available and clearly defined in the role description, leave the field empty.";

pub const MEASURED_ROLE_EXTRACTION_INSTRUCTION: &str = "Turn this brain dump of an \
    employee's experience at a company into structured information that can go into a \
    resume: the key activities involved, the responsibilities held, the skills used, and \
    every measurable impact as a metric (what the impact was) and a value (the numerical \
    result). If any of those pieces of information is not available and clearly defined \
    in the text, leave the field empty.";
