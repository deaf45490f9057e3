use textmark_core::{Command, RawSelection, ScaleValue};

pub const HELP: &str = "\
commands:
  n|next [count]      next page            p|prev [count]     previous page
  g|page <n>          go to page           + / -              zoom in / out
  zoom <value>        1.5, 150%, page-width, page-fit, auto
  fw|fit-width        fit width            fp|fit-page        fit page
  rotate [deg]        rotate all pages (default 90)
  spans               list overlay nodes of the current page
  select <a> <b>      select overlay nodes a..=b and mark them
  mark <text>         mark free text as if selected on the page
  marks               list marked text     copy <id>          copy a mark
  clear               clear all marks      recalc             rebuild text layers
  debug               toggle debug mode    enhanced           toggle enhanced selection
  dump                print overlay nodes as JSON
  status | help | q";

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(Command),
    ListSpans,
    ListMarks,
    Copy { label: String },
    Dump,
    Status,
    Help,
    Quit,
    None,
    Invalid(String),
}

pub fn parse_line(line: &str) -> UiEvent {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "" => UiEvent::None,
        "n" | "next" => match parse_count(rest) {
            Some(count) => UiEvent::Command(Command::NextPage { count }),
            None => invalid("next takes a positive count"),
        },
        "p" | "prev" => match parse_count(rest) {
            Some(count) => UiEvent::Command(Command::PrevPage { count }),
            None => invalid("prev takes a positive count"),
        },
        "g" | "page" => match rest.parse::<usize>() {
            Ok(page) => UiEvent::Command(Command::GotoPage { page }),
            Err(_) => invalid("page takes a page number"),
        },
        "+" | "zoom-in" => UiEvent::Command(Command::ZoomIn),
        "-" | "zoom-out" => UiEvent::Command(Command::ZoomOut),
        "zoom" => match rest.parse::<ScaleValue>() {
            Ok(value) => UiEvent::Command(Command::SetZoom { value }),
            Err(err) => UiEvent::Invalid(err.to_string()),
        },
        "fw" | "fit-width" => UiEvent::Command(Command::FitWidth),
        "fp" | "fit-page" => UiEvent::Command(Command::FitPage),
        "rotate" => {
            let degrees = if rest.is_empty() {
                Ok(90)
            } else {
                rest.parse::<i32>()
            };
            match degrees {
                Ok(degrees) => UiEvent::Command(Command::Rotate { degrees }),
                Err(_) => invalid("rotate takes degrees"),
            }
        }
        "debug" => UiEvent::Command(Command::ToggleDebug),
        "enhanced" => UiEvent::Command(Command::ToggleEnhancedSelection),
        "recalc" => UiEvent::Command(Command::RecalculateTextLayer),
        "clear" => UiEvent::Command(Command::ClearMarks),
        "select" => {
            let mut bounds = rest.split_whitespace().map(str::parse::<usize>);
            match (bounds.next(), bounds.next(), bounds.next()) {
                (Some(Ok(start)), Some(Ok(end)), None) => {
                    UiEvent::Command(Command::Select { start, end })
                }
                (Some(Ok(start)), None, None) => UiEvent::Command(Command::Select {
                    start,
                    end: start,
                }),
                _ => invalid("select takes one or two node indices"),
            }
        }
        "mark" => UiEvent::Command(Command::SubmitSelection(RawSelection {
            text: rest.to_string(),
            collapsed: rest.is_empty(),
            inside_text_layer: true,
            spans_multiple_containers: false,
        })),
        "spans" => UiEvent::ListSpans,
        "marks" => UiEvent::ListMarks,
        "copy" if !rest.is_empty() => UiEvent::Copy {
            label: rest.to_string(),
        },
        "copy" => invalid("copy takes a mark id"),
        "dump" => UiEvent::Dump,
        "status" => UiEvent::Status,
        "help" | "?" => UiEvent::Help,
        "q" | "quit" | "exit" => UiEvent::Quit,
        other => UiEvent::Invalid(format!("unknown command {other:?}, try help")),
    }
}

fn parse_count(raw: &str) -> Option<usize> {
    if raw.is_empty() {
        return Some(1);
    }
    raw.parse::<usize>().ok().filter(|count| *count > 0)
}

fn invalid(message: &str) -> UiEvent {
    UiEvent::Invalid(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_uses_optional_counts() {
        assert_eq!(
            parse_line("n"),
            UiEvent::Command(Command::NextPage { count: 1 })
        );
        assert_eq!(
            parse_line("next 12"),
            UiEvent::Command(Command::NextPage { count: 12 })
        );
        assert_eq!(
            parse_line("  p 3 "),
            UiEvent::Command(Command::PrevPage { count: 3 })
        );
        assert!(matches!(parse_line("p 0"), UiEvent::Invalid(_)));
        assert_eq!(
            parse_line("g 7"),
            UiEvent::Command(Command::GotoPage { page: 7 })
        );
    }

    #[test]
    fn zoom_accepts_numbers_and_fit_modes() {
        assert_eq!(
            parse_line("zoom 150%"),
            UiEvent::Command(Command::SetZoom {
                value: ScaleValue::Numeric(1.5)
            })
        );
        assert_eq!(
            parse_line("zoom page-fit"),
            UiEvent::Command(Command::SetZoom {
                value: ScaleValue::PageFit
            })
        );
        assert!(matches!(parse_line("zoom huge"), UiEvent::Invalid(_)));
        assert_eq!(parse_line("+"), UiEvent::Command(Command::ZoomIn));
        assert_eq!(parse_line("fw"), UiEvent::Command(Command::FitWidth));
    }

    #[test]
    fn rotate_defaults_to_a_quarter_turn() {
        assert_eq!(
            parse_line("rotate"),
            UiEvent::Command(Command::Rotate { degrees: 90 })
        );
        assert_eq!(
            parse_line("rotate -90"),
            UiEvent::Command(Command::Rotate { degrees: -90 })
        );
    }

    #[test]
    fn select_takes_one_or_two_indices() {
        assert_eq!(
            parse_line("select 2 5"),
            UiEvent::Command(Command::Select { start: 2, end: 5 })
        );
        assert_eq!(
            parse_line("select 4"),
            UiEvent::Command(Command::Select { start: 4, end: 4 })
        );
        assert!(matches!(parse_line("select a b"), UiEvent::Invalid(_)));
        assert!(matches!(parse_line("select 1 2 3"), UiEvent::Invalid(_)));
    }

    #[test]
    fn mark_submits_free_text() {
        match parse_line("mark hello  world") {
            UiEvent::Command(Command::SubmitSelection(raw)) => {
                assert_eq!(raw.text, "hello  world");
                assert!(!raw.collapsed);
                assert!(raw.inside_text_layer);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match parse_line("mark") {
            UiEvent::Command(Command::SubmitSelection(raw)) => assert!(raw.collapsed),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn listing_and_meta_commands() {
        assert_eq!(parse_line(""), UiEvent::None);
        assert_eq!(parse_line("marks"), UiEvent::ListMarks);
        assert_eq!(
            parse_line("copy 3fa9"),
            UiEvent::Copy {
                label: "3fa9".to_string()
            }
        );
        assert!(matches!(parse_line("copy"), UiEvent::Invalid(_)));
        assert_eq!(parse_line("q"), UiEvent::Quit);
        assert!(matches!(parse_line("frobnicate"), UiEvent::Invalid(_)));
    }
}
