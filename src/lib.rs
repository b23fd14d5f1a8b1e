pub mod shared {
    pub mod core {
        pub mod backoff;
        pub mod primitives;
    }
    pub mod infrastructure {
        pub mod reachability;
    }
}

pub mod modules {
    pub mod punches {
        pub mod core {
            pub mod punch_event;
            pub mod punch_intent;
            pub mod punch_type;
            pub mod sync_state;
        }
        pub mod queue {
            pub mod errors;
            pub mod punch_queue;
        }
        pub mod sync {
            pub mod coordinator;
            pub mod drain_report;
        }
        pub mod use_cases {
            pub mod record_punch {
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
            }
            pub mod report_backlog {
                pub mod reporter;
                pub mod inbound {
                    pub mod graphql;
                    pub mod http;
                }
            }
            pub mod manage_failed_punches {
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod drain_queue {
                pub mod inbound {
                    pub mod http;
                }
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod acceptance;
                pub mod punch_journal;
            }
        }
    }
    pub mod connectivity {
        pub mod core {
            pub mod debouncer;
        }
        pub mod monitor;
    }
}

pub mod shell;
