use {
    anyhow::Result,
    clap::Subcommand,
    helpline_common::types::{Ticket, TicketStatus},
    helpline_config::HelplineConfig,
    helpline_tickets::TicketStore,
};

use crate::db_commands::open_store;

#[derive(Subcommand)]
pub enum TicketAction {
    /// List tickets, most recently updated first.
    List {
        /// Only tickets in this status (pending, open, closed).
        #[arg(long)]
        status: Option<TicketStatus>,
    },
}

pub async fn handle_tickets(action: &TicketAction, config: &HelplineConfig) -> Result<()> {
    match action {
        TicketAction::List { status } => {
            let store = open_store(config).await?;
            let tickets = store.list_tickets(*status).await?;
            if tickets.is_empty() {
                println!("No tickets found.");
            } else {
                for ticket in &tickets {
                    println!("{}", format_row(ticket));
                }
            }
            Ok(())
        },
    }
}

fn format_row(ticket: &Ticket) -> String {
    let queue = ticket
        .queue_id
        .map_or_else(|| "-".to_string(), |q| q.to_string());
    let user = ticket
        .user_id
        .map_or_else(|| "-".to_string(), |u| u.to_string());
    let bot = if ticket.chatbot { " bot" } else { "" };
    let last = ticket.last_message.as_deref().unwrap_or("");
    format!(
        "#{:<5} {:<8} contact={} queue={queue} user={user} unread={}{bot}  {last}",
        ticket.id,
        ticket.status.as_str(),
        ticket.contact_id,
        ticket.unread_messages
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, helpline_common::types::MenuPosition};

    #[test]
    fn row_shows_assignment_and_last_message() {
        let ticket = Ticket {
            id: 12,
            uuid: "u".into(),
            contact_id: 3,
            connection_id: 1,
            status: TicketStatus::Pending,
            queue_id: Some(2),
            user_id: None,
            chatbot: true,
            menu: MenuPosition::Root,
            last_message: Some("hello".into()),
            unread_messages: 4,
            is_group: false,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(
            format_row(&ticket),
            "#12    pending  contact=3 queue=2 user=- unread=4 bot  hello"
        );
    }
}
