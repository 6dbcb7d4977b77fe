pub mod health_card;
