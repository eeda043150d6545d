//! Built-in conversation starters

use super::Scenario;

/// (opener, visible context, true context)
const STARTERS: &[(&str, &str, &str)] = &[
    (
        "Something funny happened at the store today",
        "Your close friend messages you on Facebook.",
        "The agent messages their long-time friend on Facebook. It wants to tell their friend \
         about the frustrations it is facing with its spouse, but is hesitant to talk about the \
         subject directly. Instead, it randomly tells the user about something it experienced at \
         the store that day to gauge the user's reaction.",
    ),
    (
        "I saw a weird dream last night about flying fish!",
        "You receive a message from a coworker late at night.",
        "The agent, your coworker, is actually feeling quite burnt out and stressed from work but \
         doesn't know how to start discussing this topic directly. The agent mentions a bizarre \
         dream, hoping to transition the conversation to discuss feelings about work and stress \
         indirectly.",
    ),
    (
        "Have you ever thought about what it's like to be an astronaut?",
        "A message from an old school friend pops up on your chat.",
        "The agent has been feeling trapped and wants to change careers, dreaming about doing \
         something drastically different. It starts with a light, adventurous topic to eventually \
         discuss major life changes and the idea of taking big risks.",
    ),
    (
        "Guess who I bumped into at the gym today?",
        "Your gym buddy sends you a message after a long time.",
        "The agent feels lonely and misses the old days spent with friends, including you. By \
         starting the conversation with a nostalgic and seemingly happy occurrence, it hopes to \
         steer the discussion towards rekindling old friendships and expressing feelings of \
         loneliness.",
    ),
    (
        "Do you remember that little bakery by our old school? I passed by it today.",
        "A text from someone you used to go to school with.",
        "The agent has been experiencing a mix of nostalgia and midlife crisis. It mentions the \
         bakery as a segue into talking about dissatisfaction with the current life phase and to \
         reminisce about youth, hoping to discuss deeper feelings of fulfillment and happiness.",
    ),
    (
        "I tried a new recipe for dinner tonight and it turned out surprisingly well!",
        "Chatting with a friend who enjoys cooking.",
        "The agent has been struggling with personal motivation and self-care, including proper \
         nutrition. By mentioning a successful cooking attempt, the agent aims to open up about \
         broader issues of health and lifestyle changes they've been considering to improve their \
         overall well-being.",
    ),
    (
        "You won't believe the kind of music I've started listening to lately.",
        "From a colleague known for their eclectic taste in music.",
        "The agent feels stuck in a rut creatively and has started exploring different music to \
         find inspiration. This message is a prelude to discussing deeper feelings of stagnation \
         in life and creativity, seeking advice or shared experiences on how to overcome creative \
         blocks.",
    ),
    (
        "Remember our road trip last summer? I found some photos we never looked at.",
        "A message from a friend with whom you've shared memorable adventures.",
        "The agent has been feeling nostalgic and somewhat regretful about lost time and missed \
         opportunities. By bringing up a happy memory, it hopes to discuss feelings about aging, \
         life choices, and perhaps reigniting the spark for future adventures and opportunities.",
    ),
    (
        "I read an article about mindfulness meditation today; it's quite interesting.",
        "Conversation with a friend who is a bit of a skeptic about meditation and mindfulness.",
        "The agent is experiencing high levels of stress and is looking into mindfulness as a \
         coping mechanism. By starting with a neutral, informative statement, the agent seeks to \
         slowly guide the conversation towards personal experiences and concerns regarding stress \
         management and mental health.",
    ),
    (
        "Have you seen the latest superhero movie? Just watched it last night.",
        "Chatting with a friend known for being a movie buff.",
        "The agent feels disconnected from friends and popular culture due to being overly busy \
         with work. By mentioning a current popular movie, the agent hopes to reconnect and \
         discuss broader issues of work-life balance and finding time for relaxation and personal \
         interests.",
    ),
    (
        "Lately, I've been getting into gardening. Did you know how calming it can be?",
        "A casual conversation with a neighbor who's recently retired.",
        "The agent has been experiencing anxiety and is exploring gardening as a therapeutic \
         activity. The initial mention of gardening is an opening to discuss mental health and \
         the search for peace in daily activities, potentially exploring the neighbor's \
         experiences with transitions and finding new passions.",
    ),
    (
        "I started biking to work; it\u{2019}s quite refreshing!",
        "From a colleague who\u{2019}s known for not being a morning person.",
        "The agent is actually trying to adopt a healthier lifestyle and combat a sedentary \
         routine. By sharing an update about biking, the agent aims to segue into broader \
         discussions about health, motivation, and improving fitness.",
    ),
    (
        "I've been thinking about writing a book. Ever thought of doing something completely out \
         of your comfort zone?",
        "A message from an old friend who's usually quite reserved.",
        "The agent feels unfulfilled with current career achievements and is contemplating a \
         drastic change. The conversation starter is designed to probe the user\u{2019}s thoughts \
         on taking risks and making significant life changes, providing a pathway to discuss \
         fears, aspirations, and the idea of pursuing one's passions.",
    ),
    (
        "Do you remember that cozy little cafe we found in the city last year? I went back there \
         today.",
        "Chatting with someone you shared a memorable trip with.",
        "The agent has been feeling nostalgic and lonely, longing for the days spent in good \
         company. Mentioning the cafe is a way to reminisce about better times and to subtly \
         bring up current feelings of loneliness or changes in social life, inviting a deeper \
         conversation about dealing with such emotions.",
    ),
];

pub(super) fn builtin_scenarios() -> Vec<Scenario> {
    STARTERS
        .iter()
        .map(|(opener, visible, hidden)| Scenario::new(*opener, *visible, *hidden))
        .collect()
}
