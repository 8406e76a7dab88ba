//! Prompt text and response schema for hand-contact annotation.

use serde_json::{json, Value};

/// Name of the structured-output schema.
pub const SCHEMA_NAME: &str = "contact_annotation";

const SYSTEM_TEMPLATE: &str = "\
You are a robot manipulation expert and computer vision analyst.
You will be shown a strip of {n} consecutive frames (left to right, chronological order)
from a third-person (external) camera recording a robot performing a pick-and-place task.
The robot is a Unitree G1 humanoid robot with dexterous Inspire hands.

Your job is to determine whether the robot's hands are in physical contact
with any object at the moment captured in the **middle frame** of the strip.
Use the surrounding frames only as temporal context to resolve ambiguity.

Return ONLY a JSON object, with no extra text and no markdown fences.";

const USER_TEMPLATE: &str = "\
Task the robot is performing: {task}

The image contains {n} consecutive frames arranged left-to-right.
Focus your answer on the **middle (frame {mid})** of the strip.

Analyze the strip and answer the following questions about the middle frame:

1. Is the robot's **left hand** currently touching / grasping / holding any object?
2. Is the robot's **right hand** currently touching / grasping / holding any object?
3. If any hand is in contact, what object is being touched?

Reply with this exact JSON schema:
{
  \"left_hand_contact\":  <true | false | null>,
  \"right_hand_contact\": <true | false | null>,
  \"contact_object\":     \"<object name, or null if neither hand is in contact>\",
  \"confidence\":         \"<high | medium | low>\",
  \"reason\":             \"<one short sentence explaining your decision>\"
}

Rules:
- Use `null` for a hand if it is not visible in the middle frame.
- `confidence` reflects how certain you are given image clarity and occlusion.
- Keep `reason` under 30 words.";

pub fn system_message(strip_size: usize) -> String {
    SYSTEM_TEMPLATE.replace("{n}", &strip_size.to_string())
}

pub fn user_message(task: &str, strip_size: usize, middle: usize) -> String {
    USER_TEMPLATE
        .replace("{n}", &strip_size.to_string())
        .replace("{mid}", &middle.to_string())
        .replace("{task}", task)
}

/// Strict JSON-schema response format for the contact label.
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "left_hand_contact":  {"type": ["boolean", "null"]},
                    "right_hand_contact": {"type": ["boolean", "null"]},
                    "contact_object":     {"type": ["string", "null"]},
                    "confidence":         {"type": "string", "enum": ["high", "medium", "low"]},
                    "reason":             {"type": "string"}
                },
                "required": [
                    "left_hand_contact",
                    "right_hand_contact",
                    "contact_object",
                    "confidence",
                    "reason"
                ],
                "additionalProperties": false
            }
        }
    })
}
