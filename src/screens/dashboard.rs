/// Main dashboard screen

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use std::collections::BTreeSet;

use crate::app::Screen;
use crate::core::{DatabasePanel, DiskUsage, Snapshot};
use crate::screens::TextEditor;
use crate::utils::{
    bytes_to_gb, bytes_to_mb, format_bytes, format_datetime, format_timestamp, join_or, truncate_string, UNTAGGED,
};

/// Everything one frame needs, borrowed from the app
pub struct RenderState<'a> {
    pub screen: Screen,
    pub snapshot: Option<&'a Snapshot>,
    pub selected_index: usize,
    pub selected_containers: &'a BTreeSet<String>,
    pub apps: &'a [String],
    pub editor: Option<&'a TextEditor>,
    pub editing_app: Option<&'a str>,
    /// Name typed so far while creating an application
    pub naming_app: Option<&'a str>,
    pub docs: Option<&'a str>,
    pub scroll: usize,
    pub status_message: Option<&'a str>,
    pub show_help: bool,
    pub busy: bool,
}

pub struct Dashboard {
    title: String,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn selected_style() -> Style {
    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
}

/// Table selection for `index`, cleared when it points past the last row
fn table_state(index: usize, len: usize) -> TableState {
    TableState::default().with_selected((index < len).then_some(index))
}

fn disk_color(disk: &DiskUsage) -> Color {
    if disk.percent >= 90.0 {
        Color::Red
    } else if disk.percent >= 75.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            title: "VPS Panel".to_string(),
        }
    }

    pub fn render(&self, frame: &mut Frame, state: &RenderState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(3), // Menu
                Constraint::Min(0),    // Content
                Constraint::Length(3), // Footer
            ])
            .split(frame.size());

        frame.render_widget(self.render_title(state), chunks[0]);

        // Menu bar
        let menu_items: Vec<Span> = Screen::all()
            .iter()
            .enumerate()
            .flat_map(|(i, screen)| {
                let style = if *screen == state.screen {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                vec![
                    Span::styled(format!(" [{}] {} ", i + 1, screen.title()), style),
                    Span::raw("  "),
                ]
            })
            .collect();

        let menu = Paragraph::new(Line::from(menu_items)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(menu, chunks[1]);

        match (state.screen, state.snapshot) {
            (Screen::Docs, _) => self.render_docs(frame, chunks[2], state),
            (Screen::Compose, snapshot) => self.render_compose(frame, chunks[2], snapshot, state),
            (_, None) => {
                let waiting = Paragraph::new(if state.busy {
                    "Inspecting host..."
                } else {
                    "No data. Press [r] to refresh."
                })
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
                frame.render_widget(waiting, chunks[2]);
            }
            (Screen::Overview, Some(snapshot)) => self.render_overview(frame, chunks[2], snapshot, state),
            (Screen::Ports, Some(snapshot)) => self.render_ports(frame, chunks[2], snapshot, state.scroll),
            (Screen::Resources, Some(snapshot)) => self.render_resources(frame, chunks[2], snapshot, state.scroll),
            (Screen::Images, Some(snapshot)) => self.render_images(frame, chunks[2], snapshot, state.selected_index),
        }

        // Footer with status message or key hints
        let footer_text = if let Some(status) = state.status_message {
            status.to_string()
        } else if let Some(name) = state.naming_app {
            format!("New application: {} | [Enter] Continue | [Esc] Cancel", name)
        } else if state.editing_app.is_some() {
            "Editing descriptor | [Ctrl+S] Save & recreate | [Esc] Close".to_string()
        } else {
            match state.screen {
                Screen::Overview => "[Space] Select | [a]ll | [s]top | [x] Remove | [r]efresh | [?] Help | [q]uit",
                Screen::Compose => "[↑↓] Select | [Enter] Edit | [n]ew app | [r]efresh | [?] Help | [q]uit",
                Screen::Ports | Screen::Resources | Screen::Docs => "[← →] Next screen | [↑↓] Scroll | [r]efresh | [?] Help | [q]uit",
                Screen::Images => "[↑↓] Select dangling | [d] Remove image | [r]efresh | [?] Help | [q]uit",
            }
            .to_string()
        };

        let footer = Paragraph::new(footer_text)
            .alignment(Alignment::Center)
            .style(if state.status_message.is_some() {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            })
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[3]);

        if state.show_help {
            self.render_help(frame, state.screen);
        }
    }

    fn render_title(&self, state: &RenderState) -> Paragraph {
        let mut spans = vec![Span::styled(
            self.title.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )];

        if let Some(snapshot) = state.snapshot {
            let disk = &snapshot.disk;
            let running = snapshot.containers.iter().filter(|c| c.state.is_running()).count();

            spans.extend([
                Span::raw("  "),
                Span::styled(format!("Disk {}: ", disk.mount_point), Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("{:.1}%", disk.percent),
                    Style::default().fg(disk_color(disk)).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" ({} free)", format_bytes(disk.available_bytes)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(" | "),
                Span::styled("Containers: ", Style::default().fg(Color::Gray)),
                Span::raw(format!("{}/{} running", running, snapshot.containers.len())),
                Span::raw(" | "),
                Span::styled(
                    format!("Updated {}", format_datetime(&snapshot.taken_at)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
        }

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
    }

    fn render_overview(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot, state: &RenderState) {
        let warning = snapshot.databases.warning();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(if warning.is_some() { 3 } else { 0 }),
            ])
            .split(area);

        let disk = &snapshot.disk;
        let metrics = Paragraph::new(Line::from(vec![
            Span::styled(format!("{}  ", disk.mount_point), Style::default().fg(Color::Gray)),
            Span::raw(format!("total {:.2} GB  ", bytes_to_gb(disk.total_bytes))),
            Span::raw(format!("used {:.2} GB  ", bytes_to_gb(disk.used_bytes))),
            Span::raw(format!("free {:.2} GB  ", bytes_to_gb(disk.available_bytes))),
            Span::styled(
                format!("{:.1}% used", disk.percent),
                Style::default().fg(disk_color(disk)).add_modifier(Modifier::BOLD),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL).title("Disk"));
        frame.render_widget(metrics, chunks[0]);

        let header = Row::new(vec!["", "Name", "Image", "Status", "Memory", "Ports"])
            .style(header_style())
            .bottom_margin(1);

        let rows: Vec<Row> = snapshot
            .containers
            .iter()
            .map(|container| {
                let marker = if state.selected_containers.contains(&container.name) {
                    "[x]"
                } else {
                    "[ ]"
                };
                let tag = snapshot
                    .container_tags(container)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| UNTAGGED.to_string());
                let ports: Vec<String> = container
                    .ports
                    .iter()
                    .map(|p| format!("{}->{}", p.host_port_label(), p.container_port))
                    .collect();
                let status_color = if container.state.is_running() {
                    Color::Green
                } else {
                    Color::Red
                };

                Row::new(vec![
                    Cell::from(marker),
                    Cell::from(container.name.clone()),
                    Cell::from(truncate_string(&tag, 30)),
                    Cell::from(Span::styled(container.status.clone(), Style::default().fg(status_color))),
                    Cell::from(format!("{:.2} MB", bytes_to_mb(container.memory_usage))),
                    Cell::from(join_or(&ports, "-")),
                ])
            })
            .collect();

        let title = if state.selected_containers.is_empty() {
            format!("Containers ({})", snapshot.containers.len())
        } else {
            format!(
                "Containers ({}, {} selected)",
                snapshot.containers.len(),
                state.selected_containers.len()
            )
        };

        let table = Table::new(
            rows,
            [
                Constraint::Length(3),
                Constraint::Percentage(20),
                Constraint::Percentage(22),
                Constraint::Percentage(20),
                Constraint::Length(11),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(selected_style());

        let mut table_state = table_state(state.selected_index, snapshot.containers.len());
        frame.render_stateful_widget(table, chunks[1], &mut table_state);

        if let Some(warning) = warning {
            let panel = Paragraph::new(Span::styled(warning, Style::default().fg(Color::Yellow)))
                .block(Block::default().borders(Borders::ALL).title("PostgreSQL"));
            frame.render_widget(panel, chunks[2]);
        }
    }

    fn render_compose(&self, frame: &mut Frame, area: Rect, snapshot: Option<&Snapshot>, state: &RenderState) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(0)])
            .split(area);

        let items: Vec<ListItem> = state
            .apps
            .iter()
            .enumerate()
            .map(|(idx, app)| {
                let running = snapshot
                    .and_then(|s| s.container(app))
                    .map(|c| c.state.is_running());
                let (dot, color) = match running {
                    Some(true) => ("●", Color::Green),
                    Some(false) => ("●", Color::Red),
                    None => ("○", Color::DarkGray),
                };
                let line = Line::from(vec![
                    Span::styled(format!("{} ", dot), Style::default().fg(color)),
                    Span::raw(app.clone()),
                ]);

                if idx == state.selected_index && state.editing_app.is_none() {
                    ListItem::new(line).style(selected_style())
                } else {
                    ListItem::new(line)
                }
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Applications ({})", state.apps.len())),
        );
        frame.render_widget(list, chunks[0]);

        match (state.editor, state.editing_app) {
            (Some(editor), Some(app)) => editor.render(frame, chunks[1], app, true),
            _ => {
                let hint = match state.naming_app {
                    Some(name) => vec![
                        Line::from(Span::styled("New application", header_style())),
                        Line::from(""),
                        Line::from(vec![Span::raw("Name: "), Span::styled(format!("{}_", name), Style::default().fg(Color::Cyan))]),
                    ],
                    None => vec![
                        Line::from("Select an application and press [Enter] to edit its descriptor."),
                        Line::from("Saving writes the file and runs the orchestration tool with --build."),
                        Line::from(""),
                        Line::from("Press [n] to create a new application."),
                    ],
                };
                let panel = Paragraph::new(hint)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title("Descriptor"));
                frame.render_widget(panel, chunks[1]);
            }
        }
    }

    fn render_ports(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot, scroll: usize) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let header = Row::new(vec!["Port", "PID", "Process", "Command"])
            .style(header_style())
            .bottom_margin(1);
        let listening = snapshot.listening();
        let rows: Vec<Row> = listening
            .iter()
            .skip(scroll)
            .map(|socket| {
                Row::new(vec![
                    socket.port.to_string(),
                    socket.pid.to_string(),
                    socket.process_name.clone(),
                    socket.command_line.clone(),
                ])
            })
            .collect();

        let omitted = snapshot.omitted_sockets();
        let title = if omitted > 0 {
            format!("Host LISTEN sockets ({}, {} without owner)", listening.len(), omitted)
        } else {
            format!("Host LISTEN sockets ({})", listening.len())
        };

        let table = Table::new(
            rows,
            [
                Constraint::Length(7),
                Constraint::Length(8),
                Constraint::Length(20),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(table, chunks[0]);

        let header = Row::new(vec!["Container", "Host port", "Container port", "Status", "Listening"])
            .style(header_style())
            .bottom_margin(1);
        let port_rows = snapshot.port_rows();
        let rows: Vec<Row> = port_rows
            .iter()
            .map(|row| {
                let listening = if row.host_listening {
                    Span::styled("yes", Style::default().fg(Color::Green))
                } else {
                    Span::styled("no", Style::default().fg(Color::Red))
                };
                Row::new(vec![
                    Cell::from(row.binding.container.clone()),
                    Cell::from(row.binding.host_port_label()),
                    Cell::from(row.binding.container_port.clone()),
                    Cell::from(row.binding.status.clone()),
                    Cell::from(listening),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(25),
                Constraint::Length(10),
                Constraint::Length(15),
                Constraint::Min(10),
                Constraint::Length(10),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(format!("Docker exposed ports ({})", port_rows.len())));
        frame.render_widget(table, chunks[1]);
    }

    fn render_resources(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot, scroll: usize) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(area);

        let header = Row::new(vec!["Container", "Mounts", "Networks"])
            .style(header_style())
            .bottom_margin(1);
        let rows: Vec<Row> = snapshot
            .volume_rows()
            .into_iter()
            .skip(scroll)
            .map(|row| {
                let height = row.mounts.len().max(1) as u16;
                Row::new(vec![
                    Cell::from(row.container),
                    Cell::from(if row.mounts.is_empty() {
                        "-".to_string()
                    } else {
                        row.mounts.join("\n")
                    }),
                    Cell::from(join_or(&row.networks, "-")),
                ])
                .height(height)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(25),
                Constraint::Percentage(50),
                Constraint::Percentage(25),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Volumes & Networks"));
        frame.render_widget(table, chunks[0]);

        let lines: Vec<Line> = match &snapshot.databases {
            DatabasePanel::Databases(names) if names.is_empty() => {
                vec![Line::from(Span::styled("No databases", Style::default().fg(Color::DarkGray)))]
            }
            DatabasePanel::Databases(names) => names.iter().map(|n| Line::from(n.clone())).collect(),
            DatabasePanel::Warning(message) => {
                vec![Line::from(Span::styled(message.clone(), Style::default().fg(Color::Yellow)))]
            }
        };

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let panel = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("PostgreSQL databases"));
        frame.render_widget(panel, side[0]);

        let items: Vec<ListItem> = snapshot
            .images_in_use()
            .into_iter()
            .map(ListItem::new)
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Images in use"));
        frame.render_widget(list, side[1]);
    }

    fn render_images(&self, frame: &mut Frame, area: Rect, snapshot: &Snapshot, selected_index: usize) {
        let rows_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows_layout[0]);

        // Uptime
        let header = Row::new(vec!["Container", "Created", "Uptime"])
            .style(header_style())
            .bottom_margin(1);
        let rows: Vec<Row> = snapshot
            .uptime_rows()
            .into_iter()
            .map(|row| {
                Row::new(vec![
                    row.container,
                    row.created
                        .as_ref()
                        .map(format_datetime)
                        .unwrap_or_else(|| "-".to_string()),
                    row.uptime.to_string(),
                ])
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(40),
                Constraint::Length(20),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Uptime"));
        frame.render_widget(table, top[0]);

        // Image details
        let header = Row::new(vec!["ID", "Tags", "Size"])
            .style(header_style())
            .bottom_margin(1);
        let rows: Vec<Row> = snapshot
            .images
            .iter()
            .map(|image| {
                Row::new(vec![
                    image.short_id.clone(),
                    join_or(&image.tags, UNTAGGED),
                    format_bytes(image.size),
                ])
            })
            .collect();
        let table = Table::new(
            rows,
            [Constraint::Length(13), Constraint::Min(10), Constraint::Length(10)],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(format!("Images ({})", snapshot.images.len())));
        frame.render_widget(table, top[1]);

        // Dangling images
        let header = Row::new(vec!["ID", "Size", "Created"])
            .style(header_style())
            .bottom_margin(1);
        let rows: Vec<Row> = snapshot
            .dangling
            .iter()
            .map(|image| {
                Row::new(vec![
                    image.short_id.clone(),
                    format_bytes(image.size),
                    format_timestamp(image.created),
                ])
            })
            .collect();

        let total: u64 = snapshot.dangling.iter().map(|i| i.size).sum();
        let title = format!(
            "Dangling images ({}, {} reclaimable, {} images total)",
            snapshot.dangling.len(),
            format_bytes(total),
            snapshot.images.len()
        );
        let table = Table::new(
            rows,
            [Constraint::Length(14), Constraint::Length(12), Constraint::Min(10)],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(selected_style());

        let mut table_state = table_state(selected_index, snapshot.dangling.len());
        frame.render_stateful_widget(table, rows_layout[1], &mut table_state);
    }

    fn render_docs(&self, frame: &mut Frame, area: Rect, state: &RenderState) {
        let text = state.docs.unwrap_or("Loading documentation...");
        let docs = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .scroll((state.scroll.min(u16::MAX as usize) as u16, 0))
            .block(Block::default().borders(Borders::ALL).title("Documentation"));
        frame.render_widget(docs, area);
    }

    fn render_help(&self, frame: &mut Frame, current_screen: Screen) {
        // Create centered overlay
        let area = frame.size();
        let popup_width = area.width.min(72);
        let popup_height = area.height.min(26);
        let popup_area = Rect {
            x: (area.width.saturating_sub(popup_width)) / 2,
            y: (area.height.saturating_sub(popup_height)) / 2,
            width: popup_width,
            height: popup_height,
        };

        let section = |title: &'static str| Line::from(Span::styled(title, header_style()));

        let mut help_text = vec![
            Line::from(Span::styled(
                "VPS Panel - Keyboard Shortcuts",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section("Global:"),
            Line::from("  [1-6]          Jump to screen"),
            Line::from("  [← →] / [Tab]  Next/Previous screen"),
            Line::from("  [↑ ↓]          Select items / scroll"),
            Line::from("  [r]            Run a new inspection pass"),
            Line::from("  [?] / [F1]     Toggle this help screen"),
            Line::from("  [q]            Quit application"),
            Line::from(""),
        ];

        match current_screen {
            Screen::Overview => {
                help_text.push(section("Overview:"));
                help_text.push(Line::from("  [Space]        Toggle selection of the highlighted container"));
                help_text.push(Line::from("  [a]            Select all / clear selection"));
                help_text.push(Line::from("  [s]            Stop selected containers"));
                help_text.push(Line::from("  [x]            Force-remove selected containers (asks first)"));
            }
            Screen::Compose => {
                help_text.push(section("Compose:"));
                help_text.push(Line::from("  [Enter] / [e]  Edit the application's descriptor"));
                help_text.push(Line::from("  [n]            Create a new application"));
                help_text.push(Line::from("  [Ctrl+S]       Save and recreate (up -d --build)"));
                help_text.push(Line::from("  [Esc]          Close the editor, discarding changes"));
            }
            Screen::Images => {
                help_text.push(section("Images:"));
                help_text.push(Line::from("  [↑ ↓]          Select a dangling image"));
                help_text.push(Line::from("  [d]            Remove the selected dangling image (asks first)"));
            }
            Screen::Ports | Screen::Resources | Screen::Docs => {
                help_text.push(section("Read-only view:"));
                help_text.push(Line::from("  [↑ ↓] / [j k]  Scroll"));
            }
        }

        help_text.push(Line::from(""));
        help_text.push(Line::from(Span::styled(
            "Press [?] or [Esc] to close this help",
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )));

        frame.render_widget(Clear, popup_area);

        let help_widget = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan))
                    .title(Span::styled(" Help ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(help_widget, popup_area);
    }
}
