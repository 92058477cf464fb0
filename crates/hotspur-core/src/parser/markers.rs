//! Line-level structural markers: act/scene headings, speaker cues, numbered
//! verse units, stage directions and apparatus headings.

use regex::Regex;

pub(crate) struct Markers {
    act: Regex,
    scene: Regex,
    inline_scene: Regex,
    speaker: Regex,
    numbered: Regex,
    stage_verb: Regex,
}

/// A speaker cue, with whatever followed the name on the same line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SpeakerCue<'a> {
    pub name: &'a str,
    pub remainder: Option<&'a str>,
}

impl Markers {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            act: Regex::new(r"^ACT\s+([IVXLC]+|\d+)\b")?,
            scene: Regex::new(r"^(?:SCENE|Scene)\s+([IVXLC]+|\d+)\b")?,
            inline_scene: Regex::new(r"\b(?:SCENE|Scene)\s+([IVXLC]+|\d+)\b")?,
            // Inner words may be short abbreviations such as `MRS.`.
            speaker: Regex::new(r"^((?:[A-Z]{2,3}\.\s+|[A-Z][A-Z'\-]*\s+)*[A-Z][A-Z'\-]*[A-Z])\.(?:\s+(.*))?$")?,
            numbered: Regex::new(r"^([IVXLCDM]+|\d+)\.?$")?,
            stage_verb: Regex::new(r"^(?:Enter|Exit|Exeunt|Re-enter)\b")?,
        })
    }

    /// `ACT <n>` heading; the second value is an inline `SCENE <n>` if present.
    pub(crate) fn act(&self, line: &str) -> Option<(u32, Option<u32>)> {
        let caps = self.act.captures(line)?;
        let act = parse_numeral(&caps[1])?;
        let rest = &line[caps.get(0).map_or(0, |m| m.end())..];
        let scene = self.inline_scene.captures(rest).and_then(|c| parse_numeral(&c[1]));
        Some((act, scene))
    }

    pub(crate) fn scene(&self, line: &str) -> Option<u32> {
        self.scene.captures(line).and_then(|c| parse_numeral(&c[1]))
    }

    pub(crate) fn speaker<'a>(&self, line: &'a str) -> Option<SpeakerCue<'a>> {
        let caps = self.speaker.captures(line)?;
        let name = caps.get(1)?.as_str();
        let remainder = caps.get(2).map(|m| m.as_str().trim()).filter(|s| !s.is_empty());
        Some(SpeakerCue { name, remainder })
    }

    pub(crate) fn numbered(&self, line: &str) -> Option<u32> {
        self.numbered.captures(line).and_then(|c| parse_numeral(&c[1]))
    }

    pub(crate) fn is_stage_direction(&self, line: &str) -> bool {
        line.starts_with(['[', '(', '<']) || self.stage_verb.is_match(line)
    }

    /// True for act, scene and numbered-unit markers.
    pub(crate) fn is_structural(&self, line: &str) -> bool {
        self.act(line).is_some() || self.scene(line).is_some() || self.numbered(line).is_some()
    }
}

/// Front/back apparatus inside a play (`Contents`, `Dramatis Personae`).
pub(crate) fn is_apparatus(line: &str) -> bool {
    let lower = line.trim_end_matches(['.', ':']).to_lowercase();
    lower == "contents" || lower.starts_with("dramatis person")
}

/// Arabic or roman numeral to its value. Zero is rejected.
pub fn parse_numeral(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok().filter(|n| *n > 0);
    }
    roman_value(s)
}

fn roman_value(s: &str) -> Option<u32> {
    let mut total = 0u32;
    let mut prev = 0u32;
    for c in s.chars().rev() {
        let v = match c.to_ascii_uppercase() {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };
        if v < prev {
            total = total.checked_sub(v)?;
        } else {
            total += v;
            prev = v;
        }
    }
    (total > 0).then_some(total)
}
