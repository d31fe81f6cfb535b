mod lookup_repositories;

pub use lookup_repositories::{
    EventRepository, OrganizationRepository, PgEventRepository, PgOrganizationRepository,
    PgProjectRepository, PgUserRepository, ProjectRepository, UserRepository,
};
