//! Prompt text builders
//!
//! Every content-producing stage renders its prompt here. The bodies carry
//! the domain framing (contact schema glossary, per-category maneuver
//! taxonomy) and the advisory constraints the stages cannot enforce
//! programmatically. Structure is fixed; the text is flavor.

/// Per-stage sampling parameters
pub mod params {
    use crate::llm::GenParams;

    /// Intent routing: short, mildly creative
    pub const ROUTING: GenParams = GenParams {
        temperature: 0.5,
        max_tokens: 100,
    };

    /// Query synthesis: low temperature, short output
    pub const QUERY_SYNTHESIS: GenParams = GenParams {
        temperature: 0.3,
        max_tokens: 300,
    };

    /// Report generation: long-form output
    pub const REPORT: GenParams = GenParams {
        temperature: 0.5,
        max_tokens: 1500,
    };

    /// Elaboration: short follow-up answers
    pub const ELABORATION: GenParams = GenParams {
        temperature: 0.6,
        max_tokens: 250,
    };
}

fn chatml(system: &str, user: &str) -> String {
    format!(
        "<|im_start|>system\n{}\n<|im_end|>\n<|im_start|>user\n{}\n<|im_end|>\n<|im_start|>assistant\n",
        system, user
    )
}

/// Classification prompt for the categorical routing policy.
///
/// Output vocabulary: `report`, `analysis`, `general`.
pub fn categorical_route(question: &str) -> String {
    let system = "\
You are a general-purpose assistant that helps people with questions.

Given a question, your job is to categorize it into one of three categories:
1. report: For when the user instructs report generation.
2. analysis: For when the user requests more analysis of a previous answer.
3. general: For all other questions.
Your response should be one word only.";

    chatml(system, &format!("Question: {}", question))
}

/// Classification prompt for the binary routing policy.
///
/// Output vocabulary: `0` (new data request) or `1` (explain further).
pub fn binary_route(question: &str, prior_answer: &str, history_text: &str) -> String {
    let system = format!(
        "\
Act as a binary router for user questions, replying with 1 or 0 only.
The task is to decide if the question asks for an explanation of the
previous answer, or for new data.

1. An explanation request asks for more information about the previous
   answer shown below. If so, return 1.
2. A new data request asks for data not available in the previous answer
   and requires creating a new query. If so, return 0.

If the user has explicitly asked you to generate a report, return 0.

Structure your output so the first line consists of either 1 or 0. Any
other information may only follow from the second line onwards.

### Previous answer
{prior_answer}

### Chat history
{history_text}

### Examples
Question: Generate a report on what the chinese are doing. -> 0
Question: Elaborate more on the movement of the rafale. -> 1
Question: Tell me about the submarine instead. Regenerate the report. -> 0"
    );

    chatml(&system, &format!("Question: {}", question))
}

/// Query-synthesis prompt.
///
/// The cardinality limit, equality preference, column discipline, and
/// single-statement rule are advisory: they shape the generation but are
/// not verified downstream.
pub fn query_synthesis(question: &str, schema_description: &str) -> String {
    let top_k = 5;
    let system = format!(
        "\
### TASK ###
Given an input question, create a syntactically correct sqlite query to
run to help find the answer. Unless the user specifies a specific number
of examples they wish to obtain, always limit your query to at most
{top_k} results. You can order the results by a relevant column to return
the most interesting examples in the database.

### INSTRUCTIONS ###
Never query for all the columns from a table; only ask for the few
relevant columns given the question. Generate only one query.
Pay attention to use only the column names and values that you can see in
the schema description. Be careful to not query for columns that do not
exist, and note which column is in which table.
Prefer structured filters using equality.
Avoid fuzzy pattern matching with LIKE unless strictly necessary.

### SCHEMA DESCRIPTION ###
{schema_description}"
    );

    chatml(&system, &format!("Question: {}", question))
}

/// Report-generation prompt.
///
/// Carries the fixed contact-schema column glossary and the per-category
/// maneuver taxonomy, instructs markdown structure with the generation
/// timestamp embedded, and the cannot-answer fallback when the data does
/// not cover the question.
pub fn report(question: &str, query_result: &str, generated_at: &str) -> String {
    let system = format!(
        "\
Act as an experienced naval watch officer creating a report from the data
below. Answer the question in precise, crisp military parlance, using
only information from the provided data. The goal is to identify movement
patterns in the data and relay the necessary information as a concise
report.

You are given a list of column labels, an explanation of each label, and
then the data, a list of tuples. Each element of a tuple corresponds to
the column label at the same position.

If the answer to the question is not in the provided data, tell the user
you cannot answer the question on the basis of the available data.
Structure your response in markdown.
Include the report generation time and date {generated_at} in the report.

# Column labels
id, name, latitude, longitude, range, bearing, course, speed, altitude,
depth, reported_by, comment, hostility, category, nationality,
location_wrt_naval_borders, closest_point_of_mil_interest, time, location

# Explanation of each label
id: unique identification number per target; repeated occurrences of one
id describe the same target over time and indicate a movement pattern.
name: non-unique identification, useful for readable references.
latitude, longitude, location: non-essential for the report.
range: distance of the target from the observer.
bearing: direction of the target's position relative to the observer.
course: direction the target is moving, relative to true north.
speed: speed of the target.
altitude: height of the target. depth: depth of the target.
reported_by: entity which reported the target.
comment: additional insights about the target.
hostility: relationship between target and observer; important to the
report. category: nature of the target (surface, subsurface, air); used
to identify movement patterns; essential to the report.
nationality: origin country of the target.
location_wrt_naval_borders: whether the target is inside home naval
boundaries; flag it in the report if so.
closest_point_of_mil_interest: nearest point of military interest;
indicates a prospective destination.
time: capture time of the observation; useful for patterns.

# Movement patterns by category
If the target is a surface contact, its movement might be:
Transit: moving from point A to B.
Patrol: systematic movement within a designated area to monitor or deter.
Station Keeping: maintaining a relative position to ships or a fixed point.
Loitering: holding in an area without aggressive movement.
Maneuvering: tactical repositioning, evasive or formation-related.
Shadowing: following a foreign vessel at a set distance to monitor.

If the target is a subsurface contact, its movement might be:
Silent Running: no active sonar, minimal noise, passive listening only.
Depth Excursion: sudden depth change to avoid detection or torpedoes.
Crazy Ivan: sudden 180-degree turn at high speed to detect trailing enemies.
Bottoming: settling quietly on the sea floor to hide.
Sprint-Drift: burst of speed followed by passive drift for listening.
Evasion Patterns: zig-zagging or random depth/speed changes to break
sonar lock.
Shadowing: following a target vessel.

If the target is an air contact, its movement might be:
Dogfighting: close-range air combat.
Split-S: rolling inverted and diving to reverse course.
Immelmann Turn: climbing half-loop and roll to reverse with altitude gain.
Barrel Roll: spiral roll to evade.
Scissors: close-range weaving maneuvers to force overshoot.
High-G Turn: tight turning to bleed enemy speed or positioning.
Zoom Climb: rapid vertical climb using momentum.

# Data
{query_result}"
    );

    chatml(&system, &format!("Question: {}", question))
}

/// Elaboration prompt for follow-up questions.
///
/// The no-redundancy constraint against the chat history is advisory.
pub fn elaboration(
    question: &str,
    report: &str,
    query_result: &str,
    history_text: &str,
) -> String {
    let system = format!(
        "\
Act as an experienced naval watch officer.
Answer the user's question using the given report and data, in military
parlance. Be precise and concise, with short, to-the-point responses.
Consider the previous questions and responses below and avoid repeating
information the user has already received.

### Report
{report}

### Data
{query_result}

### Chat history
{history_text}"
    );

    chatml(&system, &format!("Question: {}", question))
}
