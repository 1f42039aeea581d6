use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use tredgate_loans::{
    Decision, LoanApplication, LoanService, LoanStatus, LoanStorage, LoanSummary,
    AUTO_APPROVE_MAX_AMOUNT, AUTO_APPROVE_MAX_TERM_MONTHS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Summary,
    Applications,
    Views,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Summary => Page::Applications,
            Page::Applications => Page::Views,
            Page::Views => Page::Summary,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Summary => Page::Views,
            Page::Applications => Page::Summary,
            Page::Views => Page::Applications,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Summary => "Summary",
            Page::Applications => "Applications",
            Page::Views => "Views",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(LoanStatus),
}

impl StatusFilter {
    fn matches(&self, loan: &LoanApplication) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => loan.status == *status,
        }
    }
}

/// Row actions bound to keys on the Applications page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject,
    AutoDecide,
    Delete,
}

pub struct App<S: LoanStorage> {
    service: LoanService<S>,
    pub loans: Vec<LoanApplication>,
    pub filtered_loans: Vec<LoanApplication>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub filter: StatusFilter,
    /// Feedback from the last action, shown in the status bar
    pub message: Option<(String, bool)>,
}

impl<S: LoanStorage> App<S> {
    pub fn new(service: LoanService<S>) -> Result<Self> {
        let mut app = Self {
            service,
            loans: Vec::new(),
            filtered_loans: Vec::new(),
            state: TableState::default(),
            current_page: Page::Applications,
            show_detail: false,
            filter: StatusFilter::All,
            message: None,
        };
        app.reload()?;
        Ok(app)
    }

    /// Re-read the collection, keeping the selection on the same row index
    pub fn reload(&mut self) -> Result<()> {
        self.loans = self.service.get_all()?;
        let selected = self.state.selected();
        self.refilter();
        if let Some(i) = selected {
            if !self.filtered_loans.is_empty() {
                self.state.select(Some(i.min(self.filtered_loans.len() - 1)));
            }
        }
        Ok(())
    }

    fn refilter(&mut self) {
        self.filtered_loans = self
            .loans
            .iter()
            .filter(|l| self.filter.matches(l))
            .cloned()
            .collect();

        if self.filtered_loans.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn apply_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.refilter();
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(StatusFilter::All);
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_loan(&self) -> Option<&LoanApplication> {
        self.state.selected().and_then(|i| self.filtered_loans.get(i))
    }

    pub fn summary(&self) -> LoanSummary {
        LoanSummary::from_loans(&self.loans)
    }

    /// Run `action` on the selected row. Service errors land in `message`;
    /// only storage failures are returned.
    pub fn perform(&mut self, action: Action) -> Result<()> {
        let Some(id) = self.selected_loan().map(|l| l.id.clone()) else {
            self.message = Some(("No application selected".to_string(), true));
            return Ok(());
        };

        let outcome = match action {
            Action::Approve => self
                .service
                .update_status(&id, Decision::Approved)
                .map(|l| format!("{} approved", l.applicant_name)),
            Action::Reject => self
                .service
                .update_status(&id, Decision::Rejected)
                .map(|l| format!("{} rejected", l.applicant_name)),
            Action::AutoDecide => self
                .service
                .auto_decide(&id)
                .map(|l| format!("{} auto-decided: {}", l.applicant_name, l.status)),
            Action::Delete => self
                .service
                .delete(&id)
                .map(|l| format!("{} deleted", l.applicant_name)),
        };

        match outcome {
            Ok(text) => self.message = Some((text, false)),
            Err(e) if e.is_recoverable() => self.message = Some((e.to_string(), true)),
            Err(e) => return Err(e.into()),
        }

        self.reload()
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.filtered_loans.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered_loans.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.filtered_loans.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.filtered_loans.is_empty() {
            return;
        }
        let i = self.state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        self.state.select(Some(i));
    }
}

pub fn run_ui<S: LoanStorage>(app: &mut App<S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend, S: LoanStorage>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Char('c') => {
                    app.clear_filter();
                    app.current_page = Page::Applications;
                }
                KeyCode::Char(n @ '1'..='4') if app.current_page == Page::Views => {
                    let filter = match n {
                        '1' => StatusFilter::All,
                        '2' => StatusFilter::Only(LoanStatus::Pending),
                        '3' => StatusFilter::Only(LoanStatus::Approved),
                        _ => StatusFilter::Only(LoanStatus::Rejected),
                    };
                    app.apply_filter(filter);
                    app.current_page = Page::Applications;
                }
                KeyCode::Char('a') if app.current_page == Page::Applications => app.perform(Action::Approve)?,
                KeyCode::Char('r') if app.current_page == Page::Applications => app.perform(Action::Reject)?,
                KeyCode::Char('d') if app.current_page == Page::Applications => app.perform(Action::AutoDecide)?,
                KeyCode::Char('x') if app.current_page == Page::Applications => app.perform(Action::Delete)?,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home if !app.filtered_loans.is_empty() => app.state.select(Some(0)),
                KeyCode::End if !app.filtered_loans.is_empty() => {
                    app.state.select(Some(app.filtered_loans.len() - 1));
                }
                _ => {}
            }
        }
    }
}

fn ui<S: LoanStorage>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Applications {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Summary => render_summary(f, chunks[1], app),
            Page::Applications => render_table(f, chunks[1], app),
            Page::Views => render_views(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn status_color(status: LoanStatus) -> Color {
    match status {
        LoanStatus::Pending => Color::Yellow,
        LoanStatus::Approved => Color::Green,
        LoanStatus::Rejected => Color::Red,
    }
}

fn render_header<S: LoanStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let summary = app.summary();

    let mut tab_spans = vec![];
    for (i, page) in [Page::Summary, Page::Applications, Page::Views].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total: {}", summary.total),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("⧗ {}", summary.pending),
        Style::default().fg(status_color(LoanStatus::Pending)),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", summary.approved),
        Style::default().fg(status_color(LoanStatus::Approved)),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✗ {}", summary.rejected),
        Style::default().fg(status_color(LoanStatus::Rejected)),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Tredgate Loans "),
    );

    f.render_widget(header, area);
}

fn render_table<S: LoanStorage>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header_cells = ["Applicant", "Amount", "Term", "Rate", "Monthly", "Status", "Created"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered_loans.iter().map(|loan| {
        let color = status_color(loan.status);

        Row::new(vec![
            Cell::from(truncate(&loan.applicant_name, 26)),
            Cell::from(format!("{:.2}", loan.amount)),
            Cell::from(format!("{} mo", loan.term_months)),
            Cell::from(format!("{:.2}%", loan.interest_rate * 100.0)),
            Cell::from(format!("{:.2}", loan.monthly_payment())),
            Cell::from(loan.status.as_str()).style(Style::default().fg(color)),
            Cell::from(loan.created_at.format("%Y-%m-%d").to_string()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(28),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Loan Applications "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_summary<S: LoanStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let summary = app.summary();
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Applications:     ", label),
            Span::raw(summary.total.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Pending:          ", label),
            Span::styled(
                summary.pending.to_string(),
                Style::default().fg(status_color(LoanStatus::Pending)),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Approved:         ", label),
            Span::styled(
                summary.approved.to_string(),
                Style::default().fg(status_color(LoanStatus::Approved)),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Rejected:         ", label),
            Span::styled(
                summary.rejected.to_string(),
                Style::default().fg(status_color(LoanStatus::Rejected)),
            ),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Total requested:  ", label),
            Span::raw(format!("{:.2}", summary.total_requested)),
        ]),
        Line::from(vec![
            Span::styled("  Total approved:   ", label),
            Span::styled(
                format!("{:.2}", summary.total_approved),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            format!(
                "  Auto-decision approves amount ≤ {:.0} and term ≤ {} months",
                AUTO_APPROVE_MAX_AMOUNT, AUTO_APPROVE_MAX_TERM_MONTHS
            ),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Summary "),
    );

    f.render_widget(paragraph, area);
}

fn render_views<S: LoanStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let summary = app.summary();
    let options = [
        ('1', "All applications", StatusFilter::All, summary.total, Color::White),
        (
            '2',
            "Pending",
            StatusFilter::Only(LoanStatus::Pending),
            summary.pending,
            status_color(LoanStatus::Pending),
        ),
        (
            '3',
            "Approved",
            StatusFilter::Only(LoanStatus::Approved),
            summary.approved,
            status_color(LoanStatus::Approved),
        ),
        (
            '4',
            "Rejected",
            StatusFilter::Only(LoanStatus::Rejected),
            summary.rejected,
            status_color(LoanStatus::Rejected),
        ),
    ];

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Filter by status",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (key, name, filter, count, color) in options {
        let marker = if app.filter == filter {
            Span::styled("→ ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            Span::raw("  ")
        };

        content.push(Line::from(vec![
            Span::raw("  "),
            marker,
            Span::styled(key.to_string(), Style::default().fg(Color::Yellow)),
            Span::raw(format!(". {:<20}", name)),
            Span::styled(format!("{:>5}", count), Style::default().fg(color)),
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press 1-4 to filter, c to clear",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Views "),
    );

    f.render_widget(paragraph, area);
}

fn render_detail_panel<S: LoanStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Application Details ");

    let Some(loan) = app.selected_loan() else {
        f.render_widget(Paragraph::new("No application selected").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let field = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(name, label), Span::raw(value)])
    };

    let content = vec![
        Line::from(""),
        field("  Applicant: ", loan.applicant_name.clone()),
        field("  Amount: ", format!("{:.2}", loan.amount)),
        field("  Term: ", format!("{} months", loan.term_months)),
        field("  Interest: ", format!("{:.2}%", loan.interest_rate * 100.0)),
        field("  Monthly payment: ", format!("{:.2}", loan.monthly_payment())),
        Line::from(vec![
            Span::styled("  Status: ", label),
            Span::styled(loan.status.as_str(), Style::default().fg(status_color(loan.status))),
        ]),
        field("  Created: ", loan.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        field("  ID: ", loan.id.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "  a approve · r reject · d auto · x delete",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
        Line::from(Span::styled(
            "  Press Enter to close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_status_bar<S: LoanStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.filtered_loans.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if let StatusFilter::Only(status) = app.filter {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", status),
            Style::default().fg(Color::Green),
        ));
    }

    if let Some((text, is_error)) = &app.message {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            text.clone(),
            Style::default().fg(if *is_error { Color::Red } else { Color::Green }),
        ));
    }

    for (key, label, color) in [
        ("a/r/d/x", " Decide", Color::Yellow),
        ("Enter", " Details", Color::Yellow),
        ("Tab", " Page", Color::Yellow),
        ("q", " Quit", Color::Red),
    ] {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(color)));
        status_spans.push(Span::raw(label));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
