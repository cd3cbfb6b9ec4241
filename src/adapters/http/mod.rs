pub mod webhook_server;
