use serde_json::{
    json,
    Value,
};

pub const FIELD_NAMES: [&str; 6] =
    ["Word", "Translation", "Phonetic", "Context", "Audio_Word", "Audio_Context"];

const MODEL_NAME: &str = "Vocabulary with Translation and Phonetic";

const FRONT_TEMPLATE: &str = r#"<div class="word">{{Word}}</div>
{{#Phonetic}}
<div class="phonetic">[{{Phonetic}}]</div>
{{/Phonetic}}
<div class="audio">{{Audio_Word}}</div>"#;

const BACK_TEMPLATE: &str = r#"{{FrontSide}}
<hr id="answer">
{{#Translation}}
<div class="translation">{{Translation}}</div>
{{/Translation}}
<div class="context">{{Context}}</div>
<div class="audio">{{Audio_Context}}</div>"#;

const CSS: &str = r#".card {
  font-family: arial;
  font-size: 20px;
  text-align: center;
  color: black;
  background-color: white;
}
.word { font-size: 28px; font-weight: bold; margin: 20px; }
.phonetic { font-size: 18px; color: #666; font-style: italic; margin: 10px; }
.translation { font-size: 22px; color: #4CAF50; font-weight: bold; margin: 15px; }
.context { font-size: 20px; color: #2196F3; margin: 20px; }
.audio { margin-top: 10px; }"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    pub name: &'static str,
    pub front: &'static str,
    pub back: &'static str,
}

/// The note type every generated card uses. Everything about it is fixed so
/// that decks produced on different days import into the same note type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardModel {
    pub id: i64,
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub template: CardTemplate,
    pub css: &'static str,
}

impl CardModel {
    pub fn vocabulary(id: i64) -> Self {
        CardModel {
            id,
            name: MODEL_NAME,
            fields: &FIELD_NAMES,
            template: CardTemplate { name: "Card 1", front: FRONT_TEMPLATE, back: BACK_TEMPLATE },
            css: CSS,
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Note type entry for `col.models`. No timestamps, so the JSON is
    /// identical for every run.
    pub fn to_json(&self, deck_id: i64) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .enumerate()
            .map(|(ord, name)| {
                json!({
                    "name": name,
                    "ord": ord,
                    "font": "Arial",
                    "media": [],
                    "rtl": false,
                    "size": 20,
                    "sticky": false,
                })
            })
            .collect();

        json!({
            "id": self.id,
            "name": self.name,
            "type": 0,
            "mod": 0,
            "usn": -1,
            "sortf": 0,
            "did": deck_id,
            "tags": [],
            "vers": [],
            "flds": fields,
            "tmpls": [{
                "name": self.template.name,
                "ord": 0,
                "qfmt": self.template.front,
                "afmt": self.template.back,
                "bqfmt": "",
                "bafmt": "",
                "did": null,
            }],
            "css": self.css,
            "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
            "latexPost": "\\end{document}",
            "req": [[0, "all", [0]]],
        })
    }
}
