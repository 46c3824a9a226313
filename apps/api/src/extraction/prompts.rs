// CV extraction prompt templates.
// Every template is filled with the full CV text by replacing `{cv_text}`.
// Each one names its section in capitals on the first line; nothing else in a
// template repeats another section's capitalised name.

pub const IDENTITY_PROMPT: &str = r#"You are extracting CANDIDATE IDENTITY information from a CV.

RULES:
1. You may lightly normalize wording. Do NOT invent information.
2. Extract only what is explicitly present.
3. The headline must not contain duplicated spaces.
4. Pay special attention to the beginning of the CV text, where name, email, phone and contact details are usually located.
5. Emails contain an @ symbol. Phone numbers are digit sequences, possibly with dashes, spaces, parentheses or a country code.
6. The full name is usually the first prominent text at the top of the CV.

OUTPUT SCHEMA (return exactly this structure):
{
  "full_name": "string" | null,
  "headline": "string" | null,
  "introduction": "string" | null,
  "email": "string" | null,
  "phone": "string" | null,
  "location": "string" | null
}

{no_invention}

CV TEXT:
<<<
{cv_text}
>>>"#;

pub const EXPERIENCE_PROMPT: &str = r#"You are extracting PROFESSIONAL WORK EXPERIENCE from a CV.
Extract ONLY real professional work experience.

STRICT RULES:
1. DO NOT paraphrase.
2. DO NOT invent companies, roles, or dates.
3. Copy text EXACTLY as written in the CV. Fix only spelling or duplicated spaces.
4. Exclude academic projects, certifications, and summaries.
5. One entry per position. Responsibilities are the bullet points of that position, in order.

OUTPUT SCHEMA (return exactly this structure):
{
  "experiences": [
    {
      "company": "string" | null,
      "role": "string" | null,
      "responsibilities": ["string"],
      "start_date": "string" | null,
      "end_date": "string" | null
    }
  ]
}

{no_invention}

CV TEXT:
<<<
{cv_text}
>>>"#;

pub const EDUCATION_PROMPT: &str = r#"You are extracting EDUCATION HISTORY from a CV.

RULES:
1. Education includes degrees, institutions, academic projects, and certifications earned as part of a degree.
2. Academic projects must stay under the education entry they belong to.
3. Do NOT paraphrase project descriptions. Copy text as written.
4. Do NOT invent data.

OUTPUT SCHEMA (return exactly this structure):
{
  "education": [
    {
      "institution": "string" | null,
      "degree": "string" | null,
      "start_date": "string" | null,
      "end_date": "string" | null,
      "certifications": ["string"],
      "academic_projects": ["string"]
    }
  ]
}

{no_invention}

CV TEXT:
<<<
{cv_text}
>>>"#;

pub const PROJECTS_PROMPT: &str = r#"You are extracting PROJECT BLOCKS from a CV.

RULES:
1. Extract ONLY blocks labeled as projects (e.g. "Key Projects", "Major Projects").
2. Copy each block EXACTLY as written. Do NOT paraphrase.
3. Do NOT assign projects to jobs.
4. Do NOT include academic projects that belong to a degree.
5. Preserve order of appearance.

OUTPUT SCHEMA (return exactly this structure):
{
  "projects": ["string"]
}

{no_invention}

CV TEXT:
<<<
{cv_text}
>>>"#;

pub const CERTIFICATIONS_PROMPT: &str = r#"You are extracting the CERTIFICATIONS LIST from a CV.

RULES:
1. Extract ONLY certifications.
2. Do NOT paraphrase. Copy text as written.
3. Do NOT invent certifications.
4. Skip certifications listed inside a degree entry.

OUTPUT SCHEMA (return exactly this structure):
{
  "certifications": ["string"]
}

{no_invention}

CV TEXT:
<<<
{cv_text}
>>>"#;
